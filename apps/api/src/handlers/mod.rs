//! HTTP handlers, one module per resource.
//!
//! ```text
//! auth        /api/auth/*
//! tariffs     /api/partidas/*, /api/buscar-partidas/
//! quotes      /api/cotizar/, /api/cotizaciones/*
//! clients     /api/clientes/*
//! shipping    /api/shipping/*
//! parameters  /api/parametros/*, /api/casillero/
//! health      /health
//! ```

pub mod auth;
pub mod clients;
pub mod health;
pub mod parameters;
pub mod quotes;
pub mod shipping;
pub mod tariffs;

use crate::error::ApiError;
use crate::AppState;
use sicarga_core::{Client, NewClient, User};

/// The client record of `user`, created on first use.
///
/// Accounts made outside registration (the seeded admin, older rows) may
/// have no client yet.
pub(crate) async fn client_for(state: &AppState, user: &User) -> Result<Client, ApiError> {
    let clients = state.db.clients();
    if let Some(client) = clients.get_by_user_id(user.id).await? {
        return Ok(client);
    }

    let prefix = state.db.parameters().client_code_prefix().await?;
    let client = clients.create(&NewClient::for_user(user), &prefix).await?;
    tracing::info!(user_id = user.id, client_id = client.id, "Client created for existing user");
    Ok(client)
}

/// Fails with 403 unless `user` is staff or owns `client_id`.
pub(crate) async fn ensure_owner_or_staff(
    state: &AppState,
    user: &User,
    client_id: Option<i64>,
) -> Result<(), ApiError> {
    if user.is_staff {
        return Ok(());
    }

    let owns = match client_id {
        Some(client_id) => state
            .db
            .clients()
            .get_by_user_id(user.id)
            .await?
            .is_some_and(|client| client.id == client_id),
        None => false,
    };

    if owns {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not have permission to access this resource"))
    }
}

/// Treats `""` and whitespace as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
