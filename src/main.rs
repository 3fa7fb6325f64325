use cocoa_ledger::api::start_server;
use cocoa_ledger::contract::{LedgerContract, SalesContract};
use cocoa_ledger::ledger::LedgerStore;
use cocoa_ledger::{logger, Config};
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};

#[actix_rt::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            logger::init_logger();
            error!(error = %e, "Configuration error");
            return Err(e.into());
        }
    };
    logger::init(config.log_format);

    let contract = match &config.db_path {
        Some(path) => {
            let store = LedgerStore::open(path)?;
            LedgerContract::open(config.contract_options(), store)?
        }
        None => {
            warn!("COCOA_DB_PATH not set; ledger state will be lost on exit");
            LedgerContract::new(config.contract_options())
        }
    };

    info!(
        contract = %contract.address(),
        operator = %contract.operator_wallet(),
        pow_prefix = %contract.proof_of_work_prefix(),
        persistent = contract.is_persistent(),
        "Contract initialized"
    );

    let contract: Arc<dyn SalesContract> = Arc::new(contract);
    start_server(&config.bind_addr, config.port, contract).await?;

    info!("Server stopped");
    Ok(())
}
