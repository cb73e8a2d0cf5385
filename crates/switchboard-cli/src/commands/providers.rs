use switchboard_config::GatewayConfig;
use switchboard_core::Result;
use switchboard_llm::ProviderRouter;

use super::build_router;

pub(super) async fn cmd_providers(config: GatewayConfig, check: bool) -> Result<()> {
    let router = build_router(&config);
    let registry = router.registry();
    if registry.is_empty() {
        println!("No usable providers. Run 'switchboard doctor' for details.");
        return Ok(());
    }

    println!("\x1b[1mProviders\x1b[0m ({} in rotation order)", registry.len());
    println!("{}", "-".repeat(60));
    for status in registry.statuses() {
        println!("  {:<20} {:<12} {}", status.name, status.kind, status.models.join(", "));
    }

    if check {
        println!();
        println!("Checking backends...");
        for (name, outcome) in check_all(&router).await {
            match outcome {
                Ok(()) => println!("  ✅ {name}"),
                Err(e) => println!("  ❌ {name}: {e}"),
            }
        }
    }
    Ok(())
}

/// Probe every provider concurrently, in registry order.
async fn check_all(router: &ProviderRouter) -> Vec<(String, Result<()>)> {
    let probes = router.registry().iter().map(|slot| {
        let provider = std::sync::Arc::clone(slot.provider());
        async move {
            let outcome = provider.health_check().await;
            (provider.name().to_string(), outcome)
        }
    });
    futures::future::join_all(probes).await
}
