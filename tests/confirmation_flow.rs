//! Integration tests for the confirmation flow
//!
//! These tests verify the integration between crates:
//! - rollcall-whatsapp: webhook payload parsing into inbound events
//! - rollcall-core: reconciliation against the contact store
//! - rollcall-sync: roster normalization into the contact schema

use std::sync::Arc;

use rollcall_core::store::flatfile::contacts_from_table;
use rollcall_core::{
    Contact, ContactStore, Decision, FlatFileStore, OptIn, ReconcileOutcome, Reconciler,
    ReplyState, SendState,
};
use rollcall_sync::roster::parse_roster;
use rollcall_whatsapp::webhook::{extract_events, WebhookEnvelope};

fn button_delivery(phone: &str, payload: &str, label: &str) -> WebhookEnvelope {
    let raw = format!(
        r#"{{"object":"whatsapp_business_account","entry":[{{"id":"1",
            "changes":[{{"field":"messages","value":{{
                "messaging_product":"whatsapp",
                "messages":[{{"from":"{phone}","id":"wamid.b",
                    "timestamp":"1700000000","type":"button",
                    "button":{{"payload":"{payload}","text":"{label}"}}}}]}}}}]}}]}}"#
    );
    serde_json::from_str(&raw).unwrap()
}

async fn seeded_store(dir: &tempfile::TempDir) -> Arc<FlatFileStore> {
    let store = Arc::new(FlatFileStore::new(dir.path().join("contacts.csv")));
    store
        .upsert(
            Contact::new("573154963483")
                .with_display_name("Ana")
                .with_opt_in(OptIn::Yes),
        )
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_button_reply_flows_into_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let reconciler = Reconciler::new(store.clone() as Arc<dyn ContactStore>);

    let envelope = button_delivery("573154963483", "btn_si", "Sí");
    let events = extract_events(&envelope);
    assert_eq!(events.len(), 1);

    let outcome = reconciler.reconcile(&events[0]).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Recorded(Decision::Yes));

    let contact = store.find("573154963483").await.unwrap().unwrap();
    assert_eq!(contact.reply_state, ReplyState::Yes);
    assert_eq!(contact.reply_correlation_id.as_deref(), Some("btn_si"));
    assert!(contact.reply_timestamp.is_some());
}

#[tokio::test]
async fn test_redelivered_button_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let reconciler = Reconciler::new(store.clone() as Arc<dyn ContactStore>);

    let events = extract_events(&button_delivery("573154963483", "btn_no", "No"));
    assert_eq!(
        reconciler.reconcile(&events[0]).await.unwrap(),
        ReconcileOutcome::Recorded(Decision::No)
    );
    assert_eq!(
        reconciler.reconcile(&events[0]).await.unwrap(),
        ReconcileOutcome::AlreadyAnswered(Decision::No)
    );

    // A later "yes" does not flip the terminal state
    let flip = extract_events(&button_delivery("573154963483", "btn_si", "Sí"));
    assert_eq!(
        reconciler.reconcile(&flip[0]).await.unwrap(),
        ReconcileOutcome::AlreadyAnswered(Decision::No)
    );
}

#[tokio::test]
async fn test_roster_import_to_eligible_contacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FlatFileStore::new(dir.path().join("contacts.csv")));

    // A spreadsheet export the way an operator would write it
    let csv = "Nombre,Teléfono Celular,opt_in\n\
               Ana García,+57 315 496-3483,si\n\
               Luis,+57 311 311 6974,no\n";
    let table = parse_roster(csv).unwrap();
    let contacts = contacts_from_table(&table).unwrap();
    assert_eq!(contacts.len(), 2);

    for contact in contacts {
        store.upsert(contact).await.unwrap();
    }

    let roster = store.load().await.unwrap();
    let eligible: Vec<&Contact> = roster.iter().filter(|c| c.is_eligible()).collect();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].phone, "573154963483");
    assert_eq!(eligible[0].opt_in, OptIn::Yes);
}

#[tokio::test]
async fn test_sent_contact_drops_out_of_next_pass() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;

    store
        .record_send(
            "573154963483",
            None,
            rollcall_core::SendRecord::Sent {
                message_id: "wamid.out".to_string(),
                at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();

    let roster = store.load().await.unwrap();
    assert_eq!(roster[0].send_state, SendState::Sent);
    assert!(roster.iter().filter(|c| c.is_eligible()).count() == 0);
}

#[tokio::test]
async fn test_reimport_preserves_answers() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let reconciler = Reconciler::new(store.clone() as Arc<dyn ContactStore>);

    let events = extract_events(&button_delivery("573154963483", "btn_si", "Sí"));
    reconciler.reconcile(&events[0]).await.unwrap();

    // Operator re-imports the roster with an updated name
    let csv = "Nombre,WhatsApp,opt_in\nAna María García,573154963483,si\n";
    let table = parse_roster(csv).unwrap();
    for contact in contacts_from_table(&table).unwrap() {
        store.upsert(contact).await.unwrap();
    }

    let contact = store.find("573154963483").await.unwrap().unwrap();
    assert_eq!(contact.display_name.as_deref(), Some("Ana María García"));
    assert_eq!(contact.reply_state, ReplyState::Yes);
}
