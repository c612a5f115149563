use serde_json::Value;
use stockpile_core::envelope::ErrorEnvelope;
use stockpile_core::models::{ConflictDescriptor, ProductId, ProductPatch, UpdateRequest, RESOURCE};
use stockpile_core::queue::EditMethod;
use stockpile_core::resolve::{
    merge_seed, resolve_restricted, resolve_version, ResolutionStep, RestrictedResolution,
    VersionResolution,
};

use crate::cli::{ConflictChoice, PermissionChoice};
use crate::commands::common::{parse_product_id, print_product, Context};
use crate::error::CliError;

pub struct UpdateArgs {
    pub id: String,
    pub version: Option<i64>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<i64>,
    pub price_cents: Option<i64>,
    pub on_conflict: ConflictChoice,
    pub on_permission: PermissionChoice,
    pub offline: bool,
}

pub async fn run_update(context: &Context, args: UpdateArgs) -> Result<(), CliError> {
    let UpdateArgs {
        id,
        version,
        name,
        sku,
        quantity,
        price_cents,
        on_conflict,
        on_permission,
        offline,
    } = args;

    let id = parse_product_id(&id)?;
    let fields = ProductPatch {
        name,
        sku,
        quantity,
        price_cents,
    };
    if fields.is_empty() {
        return Err(CliError::NoFields);
    }

    if offline {
        let Some(version) = version else {
            return Err(CliError::Config(
                "--offline requires --version; the record cannot be fetched while offline"
                    .to_string(),
            ));
        };
        let request = UpdateRequest { version, fields };
        enqueue_update(context, id, &request, true)?;
        return Ok(());
    }

    let client = context.client()?;
    let version = match version {
        Some(version) => version,
        None => client.get(id).await?.version,
    };
    let request = UpdateRequest { version, fields };

    match client.update(id, &request).await {
        Ok(product) => {
            print_product(&product);
            Ok(())
        }
        Err(error) if error.is_transient() => {
            eprintln!("Warning: {error}");
            enqueue_update(context, id, &request, false)?;
            Ok(())
        }
        Err(CliError::Api(envelope)) => {
            handle_rejection(context, id, request, envelope, on_conflict, on_permission).await
        }
        Err(error) => Err(error),
    }
}

async fn handle_rejection(
    context: &Context,
    id: ProductId,
    request: UpdateRequest,
    envelope: ErrorEnvelope,
    on_conflict: ConflictChoice,
    on_permission: PermissionChoice,
) -> Result<(), CliError> {
    if let Some(conflict) = version_conflict_from(&envelope, id) {
        return handle_version_conflict(context, id, request, conflict, on_conflict).await;
    }
    if let Some(conflict) = restricted_from(&envelope, id) {
        return handle_restricted(context, id, request, conflict, on_permission).await;
    }
    Err(CliError::Api(envelope))
}

async fn handle_version_conflict(
    context: &Context,
    id: ProductId,
    request: UpdateRequest,
    conflict: ConflictDescriptor,
    choice: ConflictChoice,
) -> Result<(), CliError> {
    let client = context.client()?;

    let resolution = match choice {
        ConflictChoice::Fail => {
            return Err(conflict_failure(&conflict));
        }
        ConflictChoice::KeepMine => VersionResolution::KeepMine,
        ConflictChoice::AcceptRemote => VersionResolution::AcceptRemote,
        ConflictChoice::Merge => {
            let server = client.get(id).await?;
            VersionResolution::MergeManual(merge_seed(&request.fields, &server))
        }
    };

    match resolve_version(&conflict, &request.fields, resolution)? {
        ResolutionStep::Resubmit(resubmission) => {
            // One follow-up write; a second conflict is reported as-is
            let product = client.update(id, &resubmission).await?;
            print_product(&product);
        }
        ResolutionStep::Refetch => {
            println!("Local changes discarded; server record:");
            let product = client.get(id).await?;
            print_product(&product);
        }
    }
    Ok(())
}

async fn handle_restricted(
    context: &Context,
    id: ProductId,
    request: UpdateRequest,
    conflict: ConflictDescriptor,
    choice: PermissionChoice,
) -> Result<(), CliError> {
    let client = context.client()?;

    let resolution = match choice {
        PermissionChoice::Fail => {
            return Err(restricted_failure(&conflict));
        }
        PermissionChoice::Drop => RestrictedResolution::DropProtectedChange,
        PermissionChoice::KeepServer => RestrictedResolution::KeepUnprotectedChanges,
    };

    let server = client.get(id).await?;
    let ResolutionStep::Resubmit(resubmission) =
        resolve_restricted(&conflict, &request, &server, resolution)?
    else {
        return Err(CliError::Config(
            "Permission resolution produced no follow-up write".to_string(),
        ));
    };

    if resubmission.fields.is_empty() {
        println!("Nothing left to submit; server record:");
        print_product(&server);
        return Ok(());
    }

    let product = client.update(id, &resubmission).await?;
    print_product(&product);
    Ok(())
}

fn enqueue_update(
    context: &Context,
    id: ProductId,
    request: &UpdateRequest,
    mark_offline: bool,
) -> Result<(), CliError> {
    let queue = context.open_queue()?;
    if mark_offline {
        queue.set_offline(true);
    }
    let edit = queue.enqueue(
        EditMethod::Put,
        format!("/v1/products/{id}"),
        serde_json::to_value(request)?,
    )?;
    println!("Queued edit {} for {id}; run `stockpile queue sync` when back online.", edit.id);
    Ok(())
}

/// Rebuild the version conflict from a CONFLICT envelope
fn version_conflict_from(envelope: &ErrorEnvelope, id: ProductId) -> Option<ConflictDescriptor> {
    if envelope.error.code != "CONFLICT" {
        return None;
    }
    let details = &envelope.error.details;
    Some(ConflictDescriptor::Version {
        resource: RESOURCE.to_string(),
        id,
        expected_version: details.get("expected_version").and_then(Value::as_i64)?,
        actual_version: details.get("actual_version").and_then(Value::as_i64)?,
    })
}

/// Rebuild the protected-field conflict from a PERMISSION_EDIT_* envelope
fn restricted_from(envelope: &ErrorEnvelope, id: ProductId) -> Option<ConflictDescriptor> {
    if !envelope.error.code.starts_with("PERMISSION_EDIT_") {
        return None;
    }
    let field = envelope.error.details.get("field")?.as_str()?;
    Some(ConflictDescriptor::Restricted {
        resource: RESOURCE.to_string(),
        id,
        field: field.to_string(),
    })
}

fn conflict_failure(conflict: &ConflictDescriptor) -> CliError {
    let ConflictDescriptor::Version {
        id,
        expected_version,
        actual_version,
        ..
    } = conflict
    else {
        return CliError::Config("Unexpected conflict shape".to_string());
    };
    CliError::Api(ErrorEnvelope::conflict(
        *id,
        *expected_version,
        *actual_version,
    ))
}

fn restricted_failure(conflict: &ConflictDescriptor) -> CliError {
    let ConflictDescriptor::Restricted { id, field, .. } = conflict else {
        return CliError::Config("Unexpected conflict shape".to_string());
    };
    CliError::Api(ErrorEnvelope::permission(*id, field))
}
