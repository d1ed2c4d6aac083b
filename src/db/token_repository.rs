use async_trait::async_trait;
use chrono::Utc;
use ethers::types::U256;
use sea_orm::{
    sea_query::OnConflict,
    ActiveValue,
    ColumnTrait,
    ConnectionTrait,
    DatabaseConnection,
    EntityTrait,
    Iterable,
    QueryFilter,
    TransactionTrait,
};

use crate::db::entity::token;
use crate::db::{ narrow, RelationFilter, Store, UPSERT_CHUNK };
use crate::enums::TokenKind;
use crate::error::{ AppError, Result };
use crate::models::{ NativeAnchor, Token, TokenRates, TokenVariant };

#[derive(Clone)]
pub struct TokenRepository {
    db: DatabaseConnection,
}

impl TokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn into_domain(model: token::Model) -> Result<Token> {
        let kind: TokenKind = model.kind.parse()?;
        let missing = |column: &str| {
            AppError::Internal(format!("Token {} ({}) has no {}", model.id, kind, column))
        };

        let existential_deposit = model.existential_deposit
            .as_deref()
            .map(U256::from_dec_str)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Corrupt existential deposit: {}", e)))?;

        let variant = match kind {
            TokenKind::SubstrateNative =>
                TokenVariant::Native {
                    anchor: NativeAnchor::Chain(model.chain_id.clone().ok_or_else(|| missing("chain_id"))?),
                    existential_deposit,
                },
            TokenKind::EvmNative =>
                TokenVariant::Native {
                    anchor: NativeAnchor::EvmNetwork(
                        model.evm_network_id.clone().ok_or_else(|| missing("evm_network_id"))?
                    ),
                    existential_deposit,
                },
            TokenKind::SubstrateOrml =>
                TokenVariant::Orml {
                    chain_id: model.chain_id.clone().ok_or_else(|| missing("chain_id"))?,
                    state_key: model.state_key.clone().ok_or_else(|| missing("state_key"))?,
                    existential_deposit,
                },
            TokenKind::EvmErc20 =>
                TokenVariant::Erc20 {
                    evm_network_id: model.evm_network_id
                        .clone()
                        .ok_or_else(|| missing("evm_network_id"))?,
                    contract_address: model.contract_address
                        .clone()
                        .ok_or_else(|| missing("contract_address"))?,
                },
        };

        let rates = model.rates
            .map(serde_json::from_value::<TokenRates>)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Corrupt rates for token {}: {}", model.id, e)))?;

        let decimals = narrow(model.decimals, "decimals", &model.id)?;

        Ok(Token {
            id: model.id,
            symbol: model.symbol,
            decimals,
            coingecko_id: model.coingecko_id,
            is_testnet: model.is_testnet,
            rates,
            variant,
        })
    }

    fn into_active_model(token: &Token) -> Result<token::ActiveModel> {
        let rates = token.rates
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Failed to encode rates: {}", e)))?;

        let (state_key, contract_address) = match &token.variant {
            TokenVariant::Orml { state_key, .. } => (Some(state_key.clone()), None),
            TokenVariant::Erc20 { contract_address, .. } => (None, Some(contract_address.clone())),
            TokenVariant::Native { .. } => (None, None),
        };

        Ok(token::ActiveModel {
            id: ActiveValue::Set(token.id.clone()),
            kind: ActiveValue::Set(token.kind().as_str().to_string()),
            symbol: ActiveValue::Set(token.symbol.clone()),
            decimals: ActiveValue::Set(i16::from(token.decimals)),
            coingecko_id: ActiveValue::Set(token.coingecko_id.clone()),
            is_testnet: ActiveValue::Set(token.is_testnet),
            rates: ActiveValue::Set(rates),
            chain_id: ActiveValue::Set(token.chain_id().map(str::to_string)),
            evm_network_id: ActiveValue::Set(token.evm_network_id().map(str::to_string)),
            contract_address: ActiveValue::Set(contract_address),
            state_key: ActiveValue::Set(state_key),
            existential_deposit: ActiveValue::Set(token.existential_deposit().map(|ed| ed.to_string())),
            updated_at: ActiveValue::Set(Utc::now()),
        })
    }

    /// Insert or overwrite every token on `conn`.
    pub(crate) async fn upsert_all<C: ConnectionTrait>(conn: &C, tokens: &[Token]) -> Result<()> {
        for batch in tokens.chunks(UPSERT_CHUNK) {
            let models = batch.iter().map(Self::into_active_model).collect::<Result<Vec<_>>>()?;
            token::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(token::Column::Id)
                        .update_columns(token::Column::iter().filter(|c| !matches!(c, token::Column::Id)))
                        .to_owned()
                )
                .exec_without_returning(conn).await?;
        }
        Ok(())
    }

    pub(crate) async fn delete_ids<C: ConnectionTrait>(conn: &C, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        token::Entity::delete_many()
            .filter(token::Column::Id.is_in(ids.iter().cloned()))
            .exec(conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Store<Token> for TokenRepository {
    async fn find(&self) -> Result<Vec<Token>> {
        token::Entity::find().all(&self.db).await?.into_iter().map(Self::into_domain).collect()
    }

    async fn find_one(&self, id: &str) -> Result<Option<Token>> {
        token::Entity::find_by_id(id.to_string()).one(&self.db).await?.map(Self::into_domain).transpose()
    }

    async fn find_by_relation(&self, filter: &RelationFilter) -> Result<Vec<Token>> {
        let query = match filter {
            RelationFilter::Chain(id) => token::Entity::find().filter(token::Column::ChainId.eq(id.as_str())),
            RelationFilter::EvmNetwork(id) =>
                token::Entity::find().filter(token::Column::EvmNetworkId.eq(id.as_str())),
        };

        query.all(&self.db).await?.into_iter().map(Self::into_domain).collect()
    }

    async fn save(&self, tokens: &[Token]) -> Result<()> {
        let txn = self.db.begin().await?;
        Self::upsert_all(&txn, tokens).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        Self::delete_ids(&self.db, ids).await
    }
}
