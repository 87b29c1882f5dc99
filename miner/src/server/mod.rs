use crate::service::MiningService;
use blockmint_core::{LedgerClient, Transaction};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::{Reply, Response, with_status};
use warp::Filter;

/// Parses the three path segments of an intake request.
pub fn parse_transaction(sender: &str, receiver: &str, amount: &str) -> Result<Transaction, String> {
    let sender: u32 = sender
        .parse()
        .map_err(|_| format!("sender is not a valid account id: {}", sender))?;
    let receiver: u32 = receiver
        .parse()
        .map_err(|_| format!("receiver is not a valid account id: {}", receiver))?;
    let amount: f32 = amount
        .parse()
        .map_err(|_| format!("amount is not a number: {}", amount))?;

    let tx = Transaction::new(sender, receiver, amount);
    tx.check_distinct_accounts().map_err(|e| e.to_string())?;
    Ok(tx)
}

fn bad_request(message: String) -> Response {
    with_status(
        warp::reply::json(&serde_json::json!({
            "status": "error",
            "message": message
        })),
        StatusCode::BAD_REQUEST,
    )
    .into_response()
}

/// POST /transactions/{sender}/{receiver}/{amount}
///
/// Replies as soon as the transaction is queued, with an empty body. Later
/// validation or mining failures are never reported to the caller.
pub async fn post_transaction<L: LedgerClient>(
    sender: String,
    receiver: String,
    amount: String,
    service: Arc<MiningService<L>>,
) -> Result<Response, warp::Rejection> {
    let tx = match parse_transaction(&sender, &receiver, &amount) {
        Ok(tx) => tx,
        Err(message) => {
            log::warn!("Rejected transaction request: {}", message);
            return Ok(bad_request(message));
        }
    };

    log::info!(
        "Received transaction from {} to {} with amount {}",
        tx.sender,
        tx.receiver,
        tx.amount
    );
    service.submit(tx);
    Ok(warp::reply().into_response())
}

pub fn status_json<L: LedgerClient>(service: &MiningService<L>) -> serde_json::Value {
    let state = service.state();
    serde_json::json!({
        "miner": {
            "version": env!("CARGO_PKG_VERSION"),
            "running": state.running.load(Ordering::SeqCst),
            "phase": state.phase(),
            "uptime_seconds": state.node_start_time.elapsed().as_secs(),
        },
        "queue": {
            "pending": service.queue_depth(),
        },
        "blocks": {
            "mined": state.blocks_mined.load(Ordering::SeqCst),
            "dropped": state.dropped.load(Ordering::SeqCst),
            "abandoned": state.abandoned.load(Ordering::SeqCst),
            "last": state.last_block(),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /status
pub async fn get_status<L: LedgerClient>(
    service: Arc<MiningService<L>>,
) -> Result<Response, warp::Rejection> {
    Ok(warp::reply::json(&status_json(&service)).into_response())
}

/// GET /health
pub async fn get_health() -> Result<Response, warp::Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp()
    }))
    .into_response())
}

pub fn routes<L: LedgerClient>(service: Arc<MiningService<L>>) -> BoxedFilter<(Response,)> {
    let service_filter = warp::any().map(move || service.clone());

    let post_tx = warp::path!("transactions" / String / String / String)
        .and(warp::post())
        .and(service_filter.clone())
        .and_then(post_transaction::<L>);

    let status = warp::path!("status")
        .and(warp::get())
        .and(service_filter)
        .and_then(get_status::<L>);

    let health = warp::path!("health").and(warp::get()).and_then(get_health);

    post_tx
        .or(status)
        .unify()
        .or(health)
        .unify()
        .with(warp::log("blockmint::http"))
        .boxed()
}

/// Serves the intake API until the process exits.
pub async fn run_server<L: LedgerClient>(service: Arc<MiningService<L>>, addr: SocketAddr) {
    log::info!("HTTP intake server running at http://{}", addr);
    warp::serve(routes(service)).run(addr).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmint_core::MemoryLedger;

    fn service() -> Arc<MiningService<MemoryLedger>> {
        Arc::new(MiningService::new(MemoryLedger::default(), None))
    }

    #[test]
    fn parses_valid_requests() {
        assert_eq!(
            parse_transaction("1", "2", "10.5"),
            Ok(Transaction::new(1, 2, 10.5))
        );
        // non-positive amounts are the worker's call, not the parser's
        assert_eq!(
            parse_transaction("1", "2", "-3"),
            Ok(Transaction::new(1, 2, -3.0))
        );
    }

    #[test]
    fn rejects_malformed_requests() {
        assert!(parse_transaction("-1", "2", "1").is_err());
        assert!(parse_transaction("1", "abc", "1").is_err());
        assert!(parse_transaction("1", "2", "ten").is_err());
        assert!(parse_transaction("5", "5", "1").is_err());
    }

    #[tokio::test]
    async fn accepted_request_queues_and_starts_worker() {
        let service = service();
        let reply = post_transaction("1".into(), "2".into(), "10".into(), service.clone())
            .await
            .unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        assert!(service.is_started());
        service.abort();
    }

    #[tokio::test]
    async fn malformed_request_is_a_bad_request() {
        let service = service();
        let reply = post_transaction("1".into(), "1".into(), "10".into(), service.clone())
            .await
            .unwrap();
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        assert!(!service.is_started());
        assert_eq!(service.queue_depth(), 0);
    }

    #[tokio::test]
    async fn status_reports_idle_service() {
        let service = service();
        let status = status_json(&service);
        assert_eq!(status["miner"]["running"], false);
        assert_eq!(status["miner"]["phase"], "idle");
        assert_eq!(status["queue"]["pending"], 0);
        assert_eq!(status["blocks"]["mined"], 0);
        assert!(status["blocks"]["last"].is_null());

        let reply = get_status(service).await.unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn routes_accept_posted_transactions() {
        let service = service();
        let filter = routes(service.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/transactions/1/2/10")
            .reply(&filter)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.body().is_empty());
        assert!(service.is_started());

        let resp = warp::test::request()
            .method("GET")
            .path("/transactions/1/2/10")
            .reply(&filter)
            .await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = warp::test::request()
            .method("POST")
            .path("/transactions/1/1/10")
            .reply(&filter)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        service.abort();
    }

    #[tokio::test]
    async fn routes_serve_status_and_health() {
        let filter = routes(service());

        let resp = warp::test::request().method("GET").path("/status").reply(&filter).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["miner"]["phase"], "idle");
        assert_eq!(body["queue"]["pending"], 0);

        let resp = warp::test::request().method("GET").path("/health").reply(&filter).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = warp::test::request().method("GET").path("/nope").reply(&filter).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(get_health().await.unwrap().status(), StatusCode::OK);
    }
}
