use seat_checkin_backend::error::AppError;
use seat_checkin_backend::{run_server, AppState};
use seat_checkin_config::{get_config, Backend, Config, ConfigError};
use seat_checkin_sheets::{GoogleSheets, InMemoryTables, TableStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = get_config()?;
    match config.backend {
        Backend::Google => {
            let (Some(spreadsheet_id), Some(key)) =
                (config.spreadsheet_id.clone(), config.gcp_service_account.as_ref())
            else {
                return Err(ConfigError::Invalid(
                    "the google backend needs spreadsheet_id and gcp_service_account",
                )
                .into());
            };
            let store = GoogleSheets::new(spreadsheet_id, key)?;
            info!(client_email = %key.client_email, "using google sheets");
            run(config, store).await
        }
        Backend::Memory => {
            warn!("using in-memory tables, registrations are lost on restart");
            run(config, InMemoryTables::new()).await
        }
    }
}

async fn run<S: TableStore + 'static>(config: Config, store: S) -> Result<(), AppError> {
    run_server(AppState::new(config, store)).await?.await
}
