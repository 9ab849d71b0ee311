//! Writing the results of an assignment run to CSV files.
//!
//! All files go into one output directory:
//!
//! - `output.csv`: statistics of every iteration, preceded by `#` comments describing the run
//! - `flow.csv`: the final flow pattern
//! - `weights.csv`: the weight of each iteration in the final flows
//! - `paths.csv` and `distances.csv`: per iteration and OD-pair, only if requested
//!
//! Distances and checksums are search weights, travel costs times the weight precision.

use crate::{algo::traffic_assignment::*, datastr::graph::*};
use csv::{Writer, WriterBuilder};
use std::{
    error::Error,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

/// What was run, written as comments at the top of the statistics file.
#[derive(Debug, Clone)]
pub struct RunDescription {
    pub input_graph: String,
    pub od_pairs: String,
    pub objective: String,
    pub function: String,
    pub shortest_path_algo: String,
    pub preprocessing_time: Duration,
    /// Search weight units per unit of travel cost.
    pub weight_precision: f64,
}

impl Default for RunDescription {
    fn default() -> Self {
        RunDescription {
            input_graph: String::new(),
            od_pairs: String::new(),
            objective: String::new(),
            function: String::new(),
            shortest_path_algo: String::new(),
            preprocessing_time: Duration::ZERO,
            weight_precision: DEFAULT_PRECISION,
        }
    }
}

/// An `AssignmentSink` writing CSV files.
pub struct CsvSink {
    output_dir: PathBuf,
    stats: Writer<File>,
    paths: Option<Writer<File>>,
    distances: Option<Writer<File>>,
}

impl CsvSink {
    /// Creates the output directory if necessary and opens the per iteration files.
    pub fn create<P: AsRef<Path>>(output_dir: P, run: &RunDescription, record_paths: bool, record_distances: bool) -> Result<Self, Box<dyn Error>> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;

        let mut file = File::create(output_dir.join("output.csv"))?;
        writeln!(file, "# Input graph: {}", run.input_graph)?;
        writeln!(file, "# OD-pairs: {}", run.od_pairs)?;
        writeln!(file, "# Objective: {}", run.objective)?;
        writeln!(file, "# Function: {}", run.function)?;
        writeln!(file, "# Shortest-path algo: {}", run.shortest_path_algo)?;
        writeln!(file, "# Preprocessing time: {}ms", run.preprocessing_time.as_secs_f64() * 1000.0)?;
        writeln!(file, "# Distance unit: 1/{} of travel cost", run.weight_precision)?;
        let stats = Writer::from_writer(file);

        let paths = if record_paths {
            // rows have as many columns as the path has edges
            let mut writer = WriterBuilder::new().flexible(true).from_path(output_dir.join("paths.csv"))?;
            writer.write_record(["numIteration", "odPair", "edges"])?;
            Some(writer)
        } else {
            None
        };

        let distances = if record_distances {
            let mut file = File::create(output_dir.join("distances.csv"))?;
            writeln!(file, "# Main file: output.csv")?;
            let mut writer = Writer::from_writer(file);
            writer.write_record(["numIteration", "odPair", "distance"])?;
            Some(writer)
        } else {
            None
        };

        Ok(CsvSink {
            output_dir,
            stats,
            paths,
            distances,
        })
    }
}

impl AssignmentSink for CsvSink {
    fn iteration(&mut self, stats: &IterationStats) -> Result<(), Box<dyn Error>> {
        self.stats.serialize(stats)?;
        self.stats.flush()?;
        Ok(())
    }

    fn wants_distances(&self) -> bool {
        self.distances.is_some()
    }

    fn distances(&mut self, iteration: usize, distances: &[Option<Weight>]) -> Result<(), Box<dyn Error>> {
        if let Some(writer) = &mut self.distances {
            for (od_pair, distance) in distances.iter().enumerate() {
                let distance = distance.map(|distance| distance.to_string()).unwrap_or_default();
                writer.write_record([iteration.to_string(), od_pair.to_string(), distance])?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    fn wants_paths(&self) -> bool {
        self.paths.is_some()
    }

    fn paths(&mut self, iteration: usize, paths: &[Vec<EdgeId>]) -> Result<(), Box<dyn Error>> {
        if let Some(writer) = &mut self.paths {
            let mut record = Vec::new();
            for (od_pair, path) in paths.iter().enumerate() {
                record.clear();
                record.push(iteration.to_string());
                record.push(od_pair.to_string());
                record.extend(path.iter().map(|edge| edge.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    fn wants_flow_pattern(&self) -> bool {
        true
    }

    fn flow_pattern(&mut self, records: &[FlowPatternRecord]) -> Result<(), Box<dyn Error>> {
        let mut file = File::create(self.output_dir.join("flow.csv"))?;
        writeln!(file, "# Main file: output.csv")?;
        let mut writer = Writer::from_writer(file);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn iteration_weights(&mut self, weights: &[f64]) -> Result<(), Box<dyn Error>> {
        let mut writer = Writer::from_path(self.output_dir.join("weights.csv"))?;
        writer.write_record(["numIteration", "weight"])?;
        for (iteration, weight) in weights.iter().enumerate() {
            writer.write_record([(iteration + 1).to_string(), weight.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(iteration: usize) -> IterationStats {
        IterationStats {
            iteration,
            sampling_interval: 1,
            customization_time_ms: 1.5,
            query_time_ms: 2.0,
            line_search_time_ms: 0.0,
            total_time_ms: 4.0,
            avg_change_in_distances: None,
            max_change_in_distances: None,
            objective_value: 10.0,
            total_travel_cost: 12.0,
            checksum: 42,
        }
    }

    #[test]
    fn writes_all_files() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let run = RunDescription {
            input_graph: "graph.csv".to_string(),
            objective: "user_eq".to_string(),
            ..Default::default()
        };
        let mut sink = CsvSink::create(dir.path(), &run, true, true)?;
        assert!(sink.wants_paths());
        assert!(sink.wants_distances());

        sink.iteration(&stats(1))?;
        sink.paths(1, &[vec![0, 2], vec![]])?;
        sink.distances(1, &[Some(17), None])?;
        sink.flow_pattern(&[FlowPatternRecord {
            num_iteration: 1,
            tail: 0,
            head: 1,
            free_flow_cost: 3.0,
            actual_cost: 4.0,
            capacity: 10.0,
            flow: 5.0,
        }])?;
        sink.iteration_weights(&[0.25, 0.75])?;
        drop(sink);

        let output = fs::read_to_string(dir.path().join("output.csv"))?;
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "# Input graph: graph.csv");
        assert_eq!(lines[2], "# Objective: user_eq");
        assert_eq!(lines[6], "# Distance unit: 1/1000 of travel cost");
        assert_eq!(
            lines[7],
            "iteration,sampling_interval,customization_time,query_time,line_search_time,total_time,avg_change,max_change,obj_function_value,total_travel_cost,checksum"
        );
        assert_eq!(lines[8], "1,1,1.5,2.0,0.0,4.0,,,10.0,12.0,42");

        assert_eq!(fs::read_to_string(dir.path().join("paths.csv"))?, "numIteration,odPair,edges\n1,0,0,2\n1,1\n");
        assert_eq!(fs::read_to_string(dir.path().join("distances.csv"))?, "# Main file: output.csv\nnumIteration,odPair,distance\n1,0,17\n1,1,\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("flow.csv"))?,
            "# Main file: output.csv\nnumIteration,tail,head,freeFlowCost,actualCost,capacity,flow\n1,0,1,3.0,4.0,10.0,5.0\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("weights.csv"))?, "numIteration,weight\n1,0.25\n2,0.75\n");
        Ok(())
    }

    #[test]
    fn optional_files_are_skipped() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut sink = CsvSink::create(dir.path(), &RunDescription::default(), false, false)?;
        assert!(!sink.wants_paths());
        assert!(!sink.wants_distances());
        sink.iteration(&stats(1))?;
        assert!(!dir.path().join("paths.csv").exists());
        assert!(!dir.path().join("distances.csv").exists());
        Ok(())
    }
}
