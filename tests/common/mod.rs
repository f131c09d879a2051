use std::io::Write;

use tempfile::NamedTempFile;

/// Connect-4 shaped fixture: `features` board cells in {0, 1, 2} and a `class` column.
pub fn board_csv(rows: usize, features: usize) -> String {
    let mut csv = (0..features)
        .map(|c| format!("c{c}"))
        .chain(std::iter::once("class".to_string()))
        .collect::<Vec<_>>()
        .join(",");
    csv.push('\n');

    for r in 0..rows {
        let cells: Vec<usize> = (0..features).map(|c| (r * 7 + c * 5 + r / 3) % 3).collect();
        let class = (cells[0] + cells[1]) % 3;
        let line = cells
            .iter()
            .chain(std::iter::once(&class))
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

#[allow(dead_code)]
pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp csv");
    file
}

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
