mod domain;
mod service;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use corerpc_endpoint::{from_fn, BoxEndpoint, Context, Middleware};
use corerpc_lb::{retry, Balancer, RandomBalancer};
use corerpc_sd::{DefaultEndpointer, EndpointerOptions, FixedInstancer, Instancer};

use domain::{LoginRequest, LoginResponse};

/// Logs the account on the way in and the outcome on the way out,
/// wrapping the inner call rather than modifying it.
fn logging_middleware() -> Middleware<LoginRequest, LoginResponse> {
    Arc::new(|next| {
        from_fn(move |ctx, req: LoginRequest| {
            let next = next.clone();
            async move {
                tracing::info!(account = %req.account, "login requested");
                let resp = next.call(ctx, req).await;
                match &resp {
                    Ok(r) if r.failed.is_none() => {
                        tracing::info!(token = %r.token, "login succeeded")
                    }
                    Ok(r) => tracing::warn!(reason = ?r.failed, "login rejected"),
                    Err(err) => tracing::error!(error = %err, "login call failed"),
                }
                resp
            }
        })
    })
}

/// Wires up `instances` fake backend instances (each just a label) behind
/// a [`FixedInstancer`], reconciled through a [`DefaultEndpointer`], so the
/// same request can be served by any of them.
fn build_endpoint(instances: Vec<String>) -> BoxEndpoint<LoginRequest, LoginResponse> {
    let instancer: Arc<dyn Instancer> = Arc::new(FixedInstancer::new(instances));
    let factory: corerpc_sd::Factory<LoginRequest, LoginResponse> = Arc::new(|instance| {
        let instance = instance.to_string();
        let endpoint = from_fn(move |_ctx: Context, req: LoginRequest| {
            let instance = instance.clone();
            async move { Ok(service::login(&instance, &req)) }
        });
        Ok((logging_middleware()(endpoint), None))
    });

    let endpointer = Arc::new(DefaultEndpointer::new(
        instancer,
        factory,
        EndpointerOptions::default(),
    ));
    let balancer: Arc<dyn Balancer<LoginRequest, LoginResponse>> =
        Arc::new(RandomBalancer::new(endpointer, 42));
    retry(3, Duration::from_secs(2), balancer)
}

/// Demo CLI, grounded on `example/user/main.go`'s single-service
/// process, minus the actual gRPC listener (no generated proto stubs
/// are available offline): it drives the same discovery/balancer/retry
/// pipeline in-process instead of over the wire.
#[derive(Parser)]
#[command(name = "corerpc-demo")]
struct Cli {
    /// Account to log in with; only "test" succeeds.
    #[arg(long, default_value = "test")]
    account: String,

    /// Number of fake backend instances to balance across.
    #[arg(long, default_value_t = 3)]
    instances: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let instances: Vec<String> = (0..cli.instances)
        .map(|i| format!("instance-{i}"))
        .collect();
    let endpoint = build_endpoint(instances);

    let request = LoginRequest {
        account: cli.account,
    };
    match endpoint.call(Context::background(), request).await {
        Ok(resp) if resp.failed.is_none() => {
            println!("login ok, token={}", resp.token);
        }
        Ok(resp) => {
            println!("login rejected: {}", resp.failed.unwrap());
        }
        Err(err) => {
            eprintln!("login failed: {err}");
            std::process::exit(1);
        }
    }
}
