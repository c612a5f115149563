use serde_json::json;
use stockpile_core::models::ProductId;
use stockpile_core::queue::EditMethod;

use crate::commands::common::{parse_product_id, Context};
use crate::error::CliError;

pub async fn run_delete(
    context: &Context,
    id: &str,
    version: Option<i64>,
    offline: bool,
) -> Result<(), CliError> {
    let id = parse_product_id(id)?;

    if offline {
        let Some(version) = version else {
            return Err(CliError::Config(
                "--offline requires --version; the record cannot be fetched while offline"
                    .to_string(),
            ));
        };
        enqueue_delete(context, id, version, true)?;
        return Ok(());
    }

    let client = context.client()?;
    let version = match version {
        Some(version) => version,
        None => client.get(id).await?.version,
    };

    match client.delete(id, version).await {
        Ok(()) => {
            println!("{id}");
            Ok(())
        }
        Err(error) if error.is_transient() => {
            eprintln!("Warning: {error}");
            enqueue_delete(context, id, version, false)?;
            Ok(())
        }
        Err(error) => Err(error),
    }
}

fn enqueue_delete(
    context: &Context,
    id: ProductId,
    version: i64,
    mark_offline: bool,
) -> Result<(), CliError> {
    let queue = context.open_queue()?;
    if mark_offline {
        queue.set_offline(true);
    }
    let edit = queue.enqueue(
        EditMethod::Delete,
        format!("/v1/products/{id}"),
        json!({ "version": version }),
    )?;
    println!("Queued delete {} for {id}; run `stockpile queue sync` when back online.", edit.id);
    Ok(())
}
