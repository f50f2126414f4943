use std::sync::Arc;
use std::time::Duration;
use switchyard::application::{CallLocks, InboundRouter, IvrEngine};
use switchyard::config::Config;
use switchyard::domain::analysis::Intent;
use switchyard::domain::customer::{CustomerContext, CustomerTier};
use switchyard::domain::department::{
    ConditionField, Department, Operator, RoutingRule, RuleCondition,
};
use switchyard::domain::ivr::{IvrMenuBuilder, IvrOption, OptionAction};
use switchyard::domain::shared::value_objects::PhoneNumber;
use switchyard::domain::tenant::Tenant;
use switchyard::infrastructure::audit::InMemoryAuditSink;
use switchyard::infrastructure::catalog::{CachingDepartmentCatalog, InMemoryDepartmentCatalog};
use switchyard::infrastructure::collaborators::{
    FixedAvailability, InMemoryCrm, PassthroughTranscriber, StaticHandoff, StaticTenantDirectory,
};
use switchyard::infrastructure::persistence::{
    run_purge_loop, InMemoryContextStore, InMemoryMenuStore, InMemorySessionStore,
};
use switchyard::interface::api::{build_router, AppState};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting Switchyard call routing engine");

    // Load configuration
    let config = Config::load("switchyard.toml")?;
    info!("Configuration loaded: {:?}", config);

    // Stores
    let contexts = Arc::new(InMemoryContextStore::new(Duration::from_secs(
        config.stores.context_ttl_secs,
    )));
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(
        config.stores.session_ttl_secs,
    )));
    let menus = Arc::new(InMemoryMenuStore::new());
    let audit = Arc::new(InMemoryAuditSink::new(config.stores.audit_capacity));

    // Collaborators (in-memory fallbacks; production wires real adapters)
    let tenants = Arc::new(StaticTenantDirectory::new());
    let crm = Arc::new(InMemoryCrm::new());
    let departments = Arc::new(InMemoryDepartmentCatalog::new());
    let catalog = Arc::new(CachingDepartmentCatalog::new(
        departments.clone(),
        Duration::from_secs(config.ivr.catalog_cache_ttl_secs),
    ));
    let availability = Arc::new(FixedAvailability::staffed());
    let handoff = Arc::new(StaticHandoff::new(PhoneNumber::new("+18005559999")));
    let transcriber = Arc::new(PassthroughTranscriber);

    provision_demo_tenant(&tenants, &crm, &departments, &menus).await;
    info!("Provisioned demo tenant (in-memory)");

    // Use cases
    let locks = Arc::new(CallLocks::new());
    let router = Arc::new(InboundRouter::new(
        tenants.clone(),
        crm.clone(),
        catalog.clone(),
        availability,
        contexts.clone(),
        handoff.clone(),
        audit.clone(),
        locks.clone(),
    ));
    let ivr = Arc::new(IvrEngine::new(
        tenants,
        menus,
        sessions.clone(),
        contexts.clone(),
        transcriber,
        handoff,
        audit.clone(),
        locks.clone(),
    ));

    // Background expiry sweep
    tokio::spawn(run_purge_loop(
        contexts,
        sessions,
        locks,
        Duration::from_secs(config.stores.purge_interval_secs),
    ));

    // REST API server
    let state = AppState { router, ivr, audit };
    let app = build_router(state);
    let bind = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("REST API server started on {}", bind);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // Keep the server running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    server.abort();

    Ok(())
}

/// Seed one tenant with departments, menus, and a CRM contact so the engine
/// is exercisable out of the box.
async fn provision_demo_tenant(
    tenants: &StaticTenantDirectory,
    crm: &InMemoryCrm,
    departments: &InMemoryDepartmentCatalog,
    menus: &InMemoryMenuStore,
) {
    let tenant = Tenant::new(
        "Acme Corp".to_string(),
        vec![PhoneNumber::new("+18005550100")],
        PhoneNumber::new("+18005550199"),
    );
    let tenant_id = tenant.id;
    tenants.register(tenant).await;

    departments
        .insert(
            Department::new(
                tenant_id,
                "Sales",
                Intent::Sales,
                PhoneNumber::new("+18005550101"),
            )
            .with_priority(1),
        )
        .await;
    departments
        .insert(
            Department::new(
                tenant_id,
                "Billing",
                Intent::Billing,
                PhoneNumber::new("+18005550102"),
            )
            .with_priority(2)
            .with_rule(RoutingRule::new(
                RuleCondition::new(
                    ConditionField::Intent,
                    Operator::Equals,
                    serde_json::json!("billing"),
                ),
                2,
                "Billing intent",
            )),
        )
        .await;
    departments
        .insert(
            Department::new(
                tenant_id,
                "Technical Support",
                Intent::Technical,
                PhoneNumber::new("+18005550103"),
            )
            .with_priority(3),
        )
        .await;

    menus
        .insert(
            IvrMenuBuilder::new(
                "main",
                tenant_id,
                "Main Menu",
                "Welcome to Acme. Press 1 for sales, 2 for billing, or say what you need.",
            )
            .option(IvrOption::new(
                "1",
                "Sales",
                OptionAction::Transfer {
                    target: PhoneNumber::new("+18005550101"),
                },
            ))
            .option(IvrOption::new(
                "2",
                "Billing",
                OptionAction::Submenu {
                    menu_id: "billing".to_string(),
                },
            ))
            .option(IvrOption::new(
                "0",
                "Goodbye",
                OptionAction::Hangup { message: None },
            ))
            .build(),
        )
        .await;
    menus
        .insert(
            IvrMenuBuilder::new(
                "billing",
                tenant_id,
                "Billing Menu",
                "Billing department. Press 1 for invoices, 2 to speak with an agent.",
            )
            .option(IvrOption::new(
                "1",
                "Invoices",
                OptionAction::Speak {
                    text: "Your latest invoice was sent to your email on file.".to_string(),
                },
            ))
            .option(IvrOption::new(
                "2",
                "Agent",
                OptionAction::Transfer {
                    target: PhoneNumber::new("+18005550102"),
                },
            ))
            .build(),
        )
        .await;

    crm.add_contact(
        tenant_id,
        PhoneNumber::new("+12125550123"),
        CustomerContext {
            customer_id: Some("crm-1001".to_string()),
            name: Some("Dana Reyes".to_string()),
            tier: CustomerTier::Enterprise,
            is_vip: true,
            ..CustomerContext::anonymous()
        },
    )
    .await;
}
