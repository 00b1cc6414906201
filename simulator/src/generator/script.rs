use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Recorded capture batches replayed in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureScript {
    pub batches: Vec<Vec<String>>,
}

impl CaptureScript {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading capture script {}", path_ref.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing capture script {}", path_ref.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcore::capture::{CaptureSource, QueueSource};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn script_loads_and_replays_in_order() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"batches:\n  - [\"Jahid\", \"Unmute\"]\n  - []\n  - [\"Emon (me)\"]\n")
            .unwrap();
        let path = temp.into_temp_path();
        let script = CaptureScript::load(&path).unwrap();
        assert_eq!(script.batches.len(), 3);

        let mut source = QueueSource::new(script.batches);
        assert_eq!(source.capture().unwrap(), vec!["Jahid", "Unmute"]);
        assert!(source.capture().unwrap().is_empty());
        assert_eq!(source.capture().unwrap(), vec!["Emon (me)"]);
    }

    #[test]
    fn malformed_script_is_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"batches: 12\n").unwrap();
        let path = temp.into_temp_path();
        assert!(CaptureScript::load(&path).is_err());
    }
}
