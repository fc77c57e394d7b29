//! Builds the processor for the configured data source.

use anyhow::{Context, Result};
use tempview_core::TemporalViewerProcessor;
use tempview_db::MemoryCatalog;
use tracing::info;

use crate::config::{AppConfig, BackendSource};

/// Open the configured backend and wrap it in a processor.
pub fn build_processor(config: &AppConfig) -> Result<TemporalViewerProcessor> {
    let processor = match config.backend()? {
        BackendSource::Fixture(path) => {
            let catalog = MemoryCatalog::from_path(&path)
                .with_context(|| format!("Failed to load fixture catalog: {}", path.display()))?;
            info!(
                fixture = %path.display(),
                tables = catalog.entries().len(),
                "Using fixture catalog"
            );
            TemporalViewerProcessor::from_backend(catalog)
        }
        BackendSource::SqlServer(conn) => sql_server(&conn)?,
    };
    Ok(processor.with_read_hint(config.read_hint))
}

#[cfg(feature = "mssql")]
fn sql_server(conn: &str) -> Result<TemporalViewerProcessor> {
    let backend = tempview_db::MssqlBackend::new(conn).context("Invalid connection string")?;
    info!(
        connection = %crate::config::redact_connection_string(conn),
        "Using SQL Server backend"
    );
    Ok(TemporalViewerProcessor::from_backend(backend))
}

#[cfg(not(feature = "mssql"))]
fn sql_server(_conn: &str) -> Result<TemporalViewerProcessor> {
    anyhow::bail!(
        "SQL Server support is not compiled in. TRY: cargo build --features mssql, \
         or use --fixture"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, FileConfig};
    use std::path::PathBuf;

    fn config_with(overrides: ConfigOverrides) -> AppConfig {
        AppConfig::resolve(PathBuf::new(), FileConfig::default(), overrides, |_| None).unwrap()
    }

    #[test]
    fn test_fixture_backend() {
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/demo.json");
        let config = config_with(ConfigOverrides {
            fixture: Some(fixture),
            ..ConfigOverrides::default()
        });
        assert!(build_processor(&config).is_ok());
    }

    #[test]
    fn test_missing_fixture_file() {
        let config = config_with(ConfigOverrides {
            fixture: Some(PathBuf::from("/nonexistent/demo.json")),
            ..ConfigOverrides::default()
        });
        let err = build_processor(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load fixture catalog"));
    }

    #[cfg(not(feature = "mssql"))]
    #[test]
    fn test_sql_server_requires_feature() {
        let config = config_with(ConfigOverrides {
            connection_string: Some("Server=tcp:db,1433".into()),
            ..ConfigOverrides::default()
        });
        let err = build_processor(&config).unwrap_err();
        assert!(err.to_string().contains("--features mssql"));
    }
}
