use crate::chart::config::ChartConfig;
use crate::chart::plan::ChartKind;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Artifact file name for a chart kind, e.g. `bar_chart.html`.
pub fn artifact_name(kind: ChartKind) -> String {
    format!("{}_chart.html", kind.as_str())
}

/// Writes a standalone HTML page that renders the configuration with
/// Highcharts. Returns the artifact path; the caller decides whether to
/// open or serve it.
pub fn write_html(config: &ChartConfig, output_dir: &Path, kind: ChartKind) -> io::Result<PathBuf> {
    let config_json = serde_json::to_string_pretty(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Data Visualization</title>
    <script src="https://code.highcharts.com/highcharts.js"></script>
    <style>
        body {{
            font-family: Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background-color: #1a1a1a;
        }}
        #container {{
            width: 100%;
            height: 500px;
        }}
    </style>
</head>
<body>
    <div id="container"></div>

    <script>
        Highcharts.chart('container', {});
    </script>
</body>
</html>
"#,
        config_json
    );

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(artifact_name(kind));
    match std::fs::write(&path, html) {
        Ok(()) => {
            info!("Chart saved as {}", path.display());
            Ok(path)
        }
        Err(e) => {
            error!("Error saving HTML file: {}", e);
            Err(e)
        }
    }
}
