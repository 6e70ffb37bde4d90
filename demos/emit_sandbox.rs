//! Submit one document to the gateway sandbox and wait for authorization.
//!
//! ```sh
//! EMISSAO_TOKEN=... RUST_LOG=emissao=debug \
//!     cargo run --example emit_sandbox --features emission
//! ```
//!
//! Gateway URLs and polling bounds come from the `EMISSAO_*` environment
//! variables; see `GatewayConfig::from_env` and `EmissionConfig::from_env`.

use std::sync::Arc;

use chrono::Utc;
use emissao::core::*;
use emissao::emission::{CancelSignal, EmissionConfig, Emitter, InMemoryStore, SubmissionOutcome};
use emissao::gateway::{GatewayConfig, HttpGateway};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = std::env::var("EMISSAO_TOKEN").map_err(|_| "EMISSAO_TOKEN is not set")?;

    let issuer = IssuerBuilder::new(
        "fazenda-boa-vista",
        PartyBuilder::new(
            "Fazenda Boa Vista Ltda",
            AddressBuilder::new("Rod. MT-130", "Zona Rural", "Primavera do Leste", "MT", "78850-000")
                .city_code("5107040")
                .build(),
        )
        .identifier("11.222.333/0001-81")
        .state_registration("13.123.456-7")
        .build(),
    )
    .regime(TaxRegime::Normal)
    .environment(Environment::Sandbox)
    .credential(token)
    .build();

    let ctx = DocumentBuilder::new("demo-1", Utc::now())
        .nature("Venda de produção do estabelecimento")
        .recipient(
            PartyBuilder::new(
                "Armazém Central S.A.",
                AddressBuilder::new("Av. Brasil", "Centro", "Rondonópolis", "MT", "78700-000")
                    .number("100")
                    .city_code("5107602")
                    .build(),
            )
            .identifier("11.444.777/0001-61")
            .state_registration("ISENTO")
            .build(),
        )
        .add_line(
            LineBuilder::new(1, "SOJA", "Soja em grãos", dec!(600), dec!(119.90))
                .ncm("12019000")
                .cfop("5101", TaxIncidence {
                    icms: false,
                    pis_cofins: true,
                    successor: false,
                })
                .unit("SC")
                .build(),
        )
        .payment(PaymentMethod::Pix)
        .build(issuer)?;

    let store = Arc::new(InMemoryStore::new());
    store.insert(ctx).await;

    let gateway = Arc::new(HttpGateway::new(GatewayConfig::from_env()?)?);
    let emitter = Emitter::new(gateway, store).with_config(EmissionConfig::from_env()?);

    let report = emitter
        .submit_and_confirm("demo-1", &CancelSignal::never())
        .await?;

    match &report.submission.outcome {
        SubmissionOutcome::Accepted { reference, .. } => println!("accepted as {reference}"),
        SubmissionOutcome::Transport { diagnostic } => println!("gateway unreachable: {diagnostic}"),
        SubmissionOutcome::Rejected { reason } => println!("rejected: {reason}"),
        SubmissionOutcome::Duplicate { reason, hint } => println!("duplicate: {reason} ({hint})"),
    }
    if let Some(poll) = &report.poll {
        println!("after {} queries: {:?}", poll.attempts, poll.outcome);
    }
    if let Some(warning) = &report.submission.store_warning {
        eprintln!("warning: {warning}");
    }

    Ok(())
}
