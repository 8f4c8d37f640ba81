use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use hepneat_fitness::network::SigmoidPerceptron;
use hepneat_sample::event::Sample;

/// Writes `value` as pretty JSON to `output_path`, or to stdout when no path is given.
pub fn save_json<T>(value: &T, output_path: Option<&Path>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    match output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_json(BufWriter::new(file), value)
                .with_context(|| format!("Failed to write JSON to {}", path.display()))
        }
        None => write_json(io::stdout().lock(), value).context("Failed to write JSON to stdout"),
    }
}

fn write_json<W, T>(mut writer: W, value: &T) -> io::Result<()>
where
    W: Write,
    T: serde::Serialize,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read an event sample (`{"variables": [...], "events": [{"id", "weight", "values"}]}`).
///
/// Arity and weights are validated while parsing.
pub fn read_sample_file<P>(path: P) -> anyhow::Result<Sample>
where
    P: AsRef<Path>,
{
    read_json_file("sample", path)
}

/// Read a JSON array of candidate networks.
pub fn read_networks_file<P>(path: P) -> anyhow::Result<Vec<SigmoidPerceptron>>
where
    P: AsRef<Path>,
{
    read_json_file("networks", path)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_write_json_is_pretty_and_newline_terminated() {
        let value = BTreeMap::from([("fitness", 0.5)]);
        let mut buf = Vec::new();
        write_json(&mut buf, &value).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\n  \"fitness\": 0.5\n}\n");
    }

    #[test]
    fn test_save_json_round_trips_through_a_file() {
        let path = std::env::temp_dir()
            .join(format!("hepneat-save-json-{}.json", std::process::id()));
        save_json(&[1.0, 2.5], Some(&path)).unwrap();
        let values: Vec<f64> = read_json_file("test", &path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(values, [1.0, 2.5]);
    }

    #[test]
    fn test_save_json_reports_the_output_path() {
        let path = std::env::temp_dir().join("hepneat-missing-dir").join("out.json");
        let err = save_json(&1, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("hepneat-missing-dir"), "{err}");
    }
}
