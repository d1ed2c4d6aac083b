use axum::{ extract::{ Path, State }, Json };

use crate::error::{ AppError, Result };
use crate::models::{ Chain, EvmNetwork, Token };

use super::AppState;

pub async fn list_chains(State(state): State<AppState>) -> Result<Json<Vec<Chain>>> {
    let mut chains = state.registry.chains.find().await?;
    chains.sort_by_key(|chain| chain.sort_index.unwrap_or(u32::MAX));
    Ok(Json(chains))
}

pub async fn get_chain(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Chain>> {
    let chain = state.registry.chains
        .find_one(&id).await?
        .ok_or_else(|| AppError::NotFound(format!("Chain {} not found", id)))?;

    Ok(Json(chain))
}

pub async fn list_evm_networks(State(state): State<AppState>) -> Result<Json<Vec<EvmNetwork>>> {
    let mut networks = state.registry.evm_networks.find().await?;
    networks.sort_by_key(|network| network.sort_index.unwrap_or(u32::MAX));
    Ok(Json(networks))
}

pub async fn get_evm_network(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<EvmNetwork>> {
    let network = state.registry.evm_networks
        .find_one(&id).await?
        .ok_or_else(|| AppError::NotFound(format!("EVM network {} not found", id)))?;

    Ok(Json(network))
}

pub async fn list_tokens(State(state): State<AppState>) -> Result<Json<Vec<Token>>> {
    let tokens = state.registry.tokens.find().await?;
    Ok(Json(tokens))
}

pub async fn get_token(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Token>> {
    let token = state.registry.tokens
        .find_one(&id).await?
        .ok_or_else(|| AppError::NotFound(format!("Token {} not found", id)))?;

    Ok(Json(token))
}
