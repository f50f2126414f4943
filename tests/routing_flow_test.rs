//! Inbound routing integration tests
//!
//! Exercise the full routing pass through the public webhook surface and
//! the application service, with in-memory infrastructure.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use switchyard::application::{CallLocks, InboundCall, InboundRouter, IvrEngine};
use switchyard::domain::analysis::Intent;
use switchyard::domain::audit::AuditSink;
use switchyard::domain::call_context::ContextStore;
use switchyard::domain::customer::{CustomerContext, CustomerTier};
use switchyard::domain::department::{
    BusinessHours, ConditionField, DaySchedule, Department, Operator, RoutingRule, RuleCondition,
};
use switchyard::domain::ivr::{IvrMenuBuilder, IvrOption, OptionAction};
use switchyard::domain::routing::RoutingOutcome;
use switchyard::domain::shared::value_objects::{CallId, PhoneNumber, TenantId};
use switchyard::domain::tenant::Tenant;
use switchyard::infrastructure::audit::InMemoryAuditSink;
use switchyard::infrastructure::catalog::InMemoryDepartmentCatalog;
use switchyard::infrastructure::collaborators::{
    FixedAvailability, InMemoryCrm, PassthroughTranscriber, StaticHandoff, StaticTenantDirectory,
};
use switchyard::infrastructure::persistence::{
    InMemoryContextStore, InMemoryMenuStore, InMemorySessionStore,
};
use switchyard::interface::api::{build_router, AppState};
use tower::ServiceExt; // For `oneshot`

const TENANT_NUMBER: &str = "+18005550100";
const CALLER: &str = "+12125550123";
const HANDOFF_TARGET: &str = "+19995550000";

struct TestStack {
    tenant_id: TenantId,
    router: Arc<InboundRouter>,
    ivr: Arc<IvrEngine>,
    contexts: Arc<InMemoryContextStore>,
    audit: Arc<InMemoryAuditSink>,
    crm: Arc<InMemoryCrm>,
}

impl TestStack {
    fn state(&self) -> AppState {
        AppState {
            router: self.router.clone(),
            ivr: self.ivr.clone(),
            audit: self.audit.clone(),
        }
    }
}

fn open_department(tenant_id: TenantId, name: &str, intent: Intent, number: &str) -> Department {
    let mut department = Department::new(tenant_id, name, intent, PhoneNumber::new(number));
    department.business_hours = BusinessHours::always_open();
    department
}

async fn build_stack(agents_available: bool) -> TestStack {
    let tenants = Arc::new(StaticTenantDirectory::new());
    let tenant = Tenant::new(
        "Acme Corp".to_string(),
        vec![PhoneNumber::new(TENANT_NUMBER)],
        PhoneNumber::new("+18005550199"),
    );
    let tenant_id = tenant.id;
    tenants.register(tenant).await;

    let catalog = Arc::new(InMemoryDepartmentCatalog::new());
    catalog
        .insert(open_department(tenant_id, "Sales", Intent::Sales, "+18005550101").with_priority(1))
        .await;
    catalog
        .insert(
            open_department(tenant_id, "Billing", Intent::Billing, "+18005550102")
                .with_priority(2)
                .with_rule(RoutingRule::new(
                    RuleCondition::new(ConditionField::Intent, Operator::Equals, json!("billing")),
                    2,
                    "Billing intent",
                )),
        )
        .await;
    catalog
        .insert(
            open_department(tenant_id, "Technical", Intent::Technical, "+18005550103")
                .with_priority(3),
        )
        .await;

    let crm = Arc::new(InMemoryCrm::new());
    crm.add_contact(
        tenant_id,
        PhoneNumber::new(CALLER),
        CustomerContext {
            customer_id: Some("crm-1001".to_string()),
            tier: CustomerTier::Enterprise,
            is_vip: true,
            ..CustomerContext::anonymous()
        },
    )
    .await;

    let menus = Arc::new(InMemoryMenuStore::new());
    menus
        .insert(
            IvrMenuBuilder::new("main", tenant_id, "Main Menu", "Welcome to Acme.")
                .option(IvrOption::new(
                    "1",
                    "Sales",
                    OptionAction::Transfer {
                        target: PhoneNumber::new("+18005550101"),
                    },
                ))
                .build(),
        )
        .await;

    let contexts = Arc::new(InMemoryContextStore::new(Duration::from_secs(3600)));
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(1800)));
    let audit = Arc::new(InMemoryAuditSink::new(1000));
    let handoff = Arc::new(StaticHandoff::new(PhoneNumber::new(HANDOFF_TARGET)));
    let availability: Arc<FixedAvailability> = if agents_available {
        Arc::new(FixedAvailability::staffed())
    } else {
        Arc::new(FixedAvailability::unstaffed())
    };
    let locks = Arc::new(CallLocks::new());

    let router = Arc::new(InboundRouter::new(
        tenants.clone(),
        crm.clone(),
        catalog,
        availability,
        contexts.clone(),
        handoff.clone(),
        audit.clone(),
        locks.clone(),
    ));
    let ivr = Arc::new(IvrEngine::new(
        tenants,
        menus,
        sessions,
        contexts.clone(),
        Arc::new(PassthroughTranscriber),
        handoff,
        audit.clone(),
        locks,
    ));

    TestStack {
        tenant_id,
        router,
        ivr,
        contexts,
        audit,
        crm,
    }
}

fn inbound(call_id: CallId, utterance: &str) -> InboundCall {
    InboundCall {
        call_id,
        dialed_number: PhoneNumber::new(TENANT_NUMBER),
        caller_number: PhoneNumber::new(CALLER),
        utterance: if utterance.is_empty() {
            None
        } else {
            Some(utterance.to_string())
        },
    }
}

#[tokio::test]
async fn test_billing_call_routes_to_billing_department() {
    let stack = build_stack(true).await;
    let call_id = CallId::new();

    let outcome = stack
        .router
        .route_call(inbound(call_id, "I have a question about my invoice payment"))
        .await;

    match outcome {
        RoutingOutcome::Route {
            department, target, ..
        } => {
            assert_eq!(department, "Billing");
            assert_eq!(target.as_str(), "+18005550102");
        }
        other => panic!("Expected route, got {:?}", other),
    }

    // decision recorded on the context, audit trail written
    let context = stack.contexts.get(call_id).await.unwrap().unwrap();
    assert_eq!(context.tenant_id, stack.tenant_id);
    assert_eq!(context.routing_history.len(), 1);
    assert_eq!(context.routing_history[0].department, "Billing");
    assert_eq!(
        context.routing_history[0].customer_tier,
        CustomerTier::Enterprise
    );
    assert!(!stack.audit.for_call(call_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_number_degrades_to_technical_difficulties() {
    let stack = build_stack(true).await;

    let outcome = stack
        .router
        .route_call(InboundCall {
            call_id: CallId::new(),
            dialed_number: PhoneNumber::new("+19990000000"),
            caller_number: PhoneNumber::new(CALLER),
            utterance: None,
        })
        .await;

    match outcome {
        RoutingOutcome::Announcement { message, .. } => {
            assert!(message.contains("technical difficulties"));
        }
        other => panic!("Expected announcement, got {:?}", other),
    }
}

#[tokio::test]
async fn test_closed_department_gets_announcement_with_callback() {
    let stack = build_stack(true).await;

    // close every department by swapping in an always-closed catalog entry
    let tenants = Arc::new(StaticTenantDirectory::new());
    let tenant = Tenant::new(
        "Night Owl".to_string(),
        vec![PhoneNumber::new("+18005550200")],
        PhoneNumber::new("+18005550299"),
    );
    let tenant_id = tenant.id;
    tenants.register(tenant).await;

    let catalog = Arc::new(InMemoryDepartmentCatalog::new());
    let mut department =
        Department::new(tenant_id, "Support", Intent::Support, PhoneNumber::new("+18005550201"));
    department.business_hours = BusinessHours {
        weekdays: DaySchedule {
            enabled: false,
            start_hour: 9,
            end_hour: 17,
        },
        weekends: DaySchedule {
            enabled: false,
            start_hour: 9,
            end_hour: 17,
        },
    };
    catalog.insert(department).await;

    let locks = Arc::new(CallLocks::new());
    let router = InboundRouter::new(
        tenants,
        stack.crm.clone(),
        catalog,
        Arc::new(FixedAvailability::staffed()),
        stack.contexts.clone(),
        Arc::new(StaticHandoff::new(PhoneNumber::new(HANDOFF_TARGET))),
        stack.audit.clone(),
        locks,
    );

    let outcome = router
        .route_call(InboundCall {
            call_id: CallId::new(),
            dialed_number: PhoneNumber::new("+18005550200"),
            caller_number: PhoneNumber::new(CALLER),
            utterance: Some("I need help".to_string()),
        })
        .await;

    match outcome {
        RoutingOutcome::Announcement {
            department,
            message,
            callback_at,
        } => {
            assert_eq!(department, "Support");
            assert!(message.contains("currently closed"));
            // next-day 09:00 callback slot
            assert_eq!(callback_at.format("%H:%M").to_string(), "09:00");
        }
        other => panic!("Expected announcement, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_agents_gets_callback_offer() {
    let stack = build_stack(false).await;

    let outcome = stack
        .router
        .route_call(inbound(CallId::new(), "billing question about my invoice"))
        .await;

    match outcome {
        RoutingOutcome::Callback {
            department,
            estimated_wait_secs,
            ..
        } => {
            assert_eq!(department, "Billing");
            assert_eq!(estimated_wait_secs, 15 * 60);
        }
        other => panic!("Expected callback, got {:?}", other),
    }
}

#[tokio::test]
async fn test_human_request_escalates_before_transfer() {
    let stack = build_stack(true).await;
    let call_id = CallId::new();

    let outcome = stack
        .router
        .route_call(inbound(call_id, "let me speak to an agent about my invoice"))
        .await;

    match outcome {
        RoutingOutcome::Route { target, .. } => {
            assert_eq!(target.as_str(), HANDOFF_TARGET);
        }
        other => panic!("Expected route, got {:?}", other),
    }

    let context = stack.contexts.get(call_id).await.unwrap().unwrap();
    assert_eq!(context.escalation_level, 1);

    let trail = stack.audit.for_call(call_id).await.unwrap();
    let escalated = trail.iter().any(|r| {
        matches!(
            &r.event,
            switchyard::domain::audit::AuditEventType::Escalated { .. }
        )
    });
    assert!(escalated, "expected an escalation audit record");
}

#[tokio::test]
async fn test_inbound_webhook_returns_outcome_and_ivr_greeting() {
    let stack = build_stack(true).await;
    let app = build_router(stack.state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/inbound-call")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "from": CALLER,
                        "to": TENANT_NUMBER,
                        "utterance": "billing please"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["outcome"]["action"], "route");
    assert_eq!(json["outcome"]["department"], "Billing");
    assert_eq!(json["ivr"]["step"], "menu");
    assert_eq!(json["ivr"]["greeting"], "Welcome to Acme.");
    assert!(json["call_id"].is_string());
}

#[tokio::test]
async fn test_health_endpoint() {
    let stack = build_stack(true).await;
    let app = build_router(stack.state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
