use actix_web::{get, post, web, HttpRequest, HttpResponse};
use alloy::primitives::utils::format_ether;
use payout::request::parse_account_address;
use payout::{ChainClient, PayoutError, WithdrawalRequest};
use serde::Deserialize;

use crate::metrics;
use crate::state::AppState;

const SERVICE_NAME: &str = "payout-server";

/// Body of the engine start and stop calls.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub wallet_address: String,
}

/// Amounts arrive as JSON numbers or strings; both are kept as decimal text.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(serde_json::Number),
    Text(String),
}

impl AmountField {
    fn into_text(self) -> String {
        match self {
            AmountField::Number(n) => n.to_string(),
            AmountField::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBody {
    pub wallet_address: String,
    pub amount: AmountField,
    #[serde(default)]
    pub token_address: Option<String>,
}

/// Constant-time byte comparison over SHA-256 digests, so neither content
/// nor length leaks through timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use sha2::{Digest, Sha256};
    use subtle::ConstantTimeEq;
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

fn error_kind(err: &PayoutError) -> &'static str {
    match err {
        PayoutError::NotReady(_) => "not_ready",
        PayoutError::InvalidAddress(_) => "invalid_address",
        PayoutError::InvalidAmount(_) => "invalid_amount",
        PayoutError::InsufficientGas { .. } => "insufficient_gas",
        PayoutError::AllAttemptsExhausted { .. } => "all_attempts_exhausted",
        PayoutError::DeliveryUnconfirmed { .. } => "delivery_unconfirmed",
        PayoutError::ConfigError(_) => "config_error",
    }
}

fn error_response(err: &PayoutError) -> HttpResponse {
    let mut body = serde_json::json!({
        "success": false,
        "error": error_kind(err),
        "message": err.to_string(),
    });
    match err {
        PayoutError::AllAttemptsExhausted {
            attempts,
            failures,
            outcomes,
        } => {
            body["attempts"] = serde_json::json!(attempts);
            body["failures"] = serde_json::json!(failures);
            body["outcomes"] = serde_json::json!(outcomes);
        }
        PayoutError::DeliveryUnconfirmed { tx_hash, .. } => {
            body["txHash"] = serde_json::json!(tx_hash);
        }
        PayoutError::InsufficientGas { balance, required } => {
            body["balanceEth"] = serde_json::json!(format_ether(*balance));
            body["requiredEth"] = serde_json::json!(format_ether(*required));
        }
        _ => {}
    }

    match err {
        PayoutError::InvalidAddress(_) | PayoutError::InvalidAmount(_) => {
            HttpResponse::BadRequest().json(body)
        }
        PayoutError::NotReady(_) => HttpResponse::ServiceUnavailable().json(body),
        PayoutError::InsufficientGas { .. } => HttpResponse::PaymentRequired().json(body),
        PayoutError::DeliveryUnconfirmed { .. } => HttpResponse::Accepted().json(body),
        PayoutError::AllAttemptsExhausted { .. } | PayoutError::ConfigError(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

#[get("/")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let connected = state.chain.is_connected().await;
    let mut response = serde_json::json!({
        "status": "online",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "network": state.network.as_str(),
        "connected": connected,
        "ready": state.is_ready(),
        "dispatcherWallet": state.identity.as_ref().map(|i| i.address()),
        "contracts": &state.contracts,
    });

    if connected {
        if let Ok(chain_id) = state.chain.chain_id().await {
            response["chainId"] = serde_json::json!(chain_id);
        }
        if let Some(identity) = &state.identity {
            if let Ok(balance) = state.chain.balance(identity.address()).await {
                response["dispatcherBalanceEth"] = serde_json::json!(format_ether(balance));
            }
        }
    }

    if !connected || !state.is_ready() {
        response["status"] = serde_json::json!("degraded");
        HttpResponse::ServiceUnavailable().json(response)
    } else {
        HttpResponse::Ok().json(response)
    }
}

#[post("/api/engine/start")]
pub async fn engine_start(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let parsed: StartRequest = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "invalid request body",
            }));
        }
    };

    if let Err(e) = parse_account_address(&parsed.wallet_address) {
        return error_response(&e);
    }

    let wallet = parsed.wallet_address.trim().to_ascii_lowercase();
    let session = state.sessions.start(&wallet);
    tracing::info!(wallet = %wallet, "engine session started");

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "walletAddress": wallet,
        "session": session,
    }))
}

#[post("/api/engine/stop")]
pub async fn engine_stop(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let parsed: StartRequest = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "invalid request body",
            }));
        }
    };

    let wallet = parsed.wallet_address.trim().to_ascii_lowercase();
    let stopped = state.sessions.remove(&wallet);
    if stopped {
        tracing::info!(wallet = %wallet, "engine session stopped");
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "walletAddress": wallet,
        "stopped": stopped,
    }))
}

/// Chain-side diagnostics. Always 200; failures show up as fields.
#[get("/api/health")]
pub async fn chain_health(state: web::Data<AppState>) -> HttpResponse {
    let connected = state.chain.is_connected().await;
    let mut response = serde_json::json!({
        "connected": connected,
        "adminConfigured": state.identity.is_some(),
        "network": state.network.as_str(),
        "chainId": null,
    });

    if !connected {
        return HttpResponse::Ok().json(response);
    }
    if let Ok(chain_id) = state.chain.chain_id().await {
        response["chainId"] = serde_json::json!(chain_id);
    }
    if let Some(identity) = &state.identity {
        response["adminAddress"] = serde_json::json!(identity.address());
        match state.chain.balance(identity.address()).await {
            Ok(balance) => {
                response["adminBalanceEth"] = serde_json::json!(format_ether(balance));
            }
            Err(e) => {
                response["balanceCheckError"] = serde_json::json!(e.to_string());
            }
        }
    }
    HttpResponse::Ok().json(response)
}

#[post("/api/engine/withdraw")]
pub async fn withdraw(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let parsed: WithdrawBody = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "invalid request body",
            }));
        }
    };

    let wallet = parsed.wallet_address.trim().to_string();
    let mut request = WithdrawalRequest::new(wallet.clone(), parsed.amount.into_text());
    if let Some(token) = parsed.token_address {
        request = request.with_preferred_contract(token);
    }

    let start = std::time::Instant::now();
    let outcome = state
        .dispatcher
        .dispatch(
            &request,
            state.identity.as_ref(),
            &state.contracts,
            &state.chain,
        )
        .await;
    let elapsed = start.elapsed().as_secs_f64();

    match outcome {
        Ok(result) => {
            metrics::record_dispatch("success", elapsed, &result.attempts);
            state.sessions.record_withdrawal(&wallet);
            tracing::info!(
                wallet = %wallet,
                contract = %result.contract.name,
                method = %result.method,
                tx = %result.tx_hash,
                "withdrawal completed"
            );

            let mut body = serde_json::json!(result);
            body["success"] = serde_json::json!(true);
            HttpResponse::Ok().json(body)
        }
        Err(e) => {
            metrics::record_dispatch(error_kind(&e), elapsed, e.attempts());
            match &e {
                PayoutError::InvalidAddress(_) | PayoutError::InvalidAmount(_) => {
                    tracing::info!(wallet = %wallet, error = %e, "withdrawal rejected")
                }
                _ => tracing::error!(wallet = %wallet, error = %e, "withdrawal failed"),
            }
            error_response(&e)
        }
    }
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            if !state.public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or PAYOUT_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
