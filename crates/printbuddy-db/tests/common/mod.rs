// Backend-agnostic integration tests for the Database trait.
//
// Each public async function accepts `&dyn Database` so that the same logic
// can be exercised against both the SQLite and Postgres backends.

use printbuddy_core::feedback::CreateFeedback;
use printbuddy_core::order::{price, CreateOrder, Locator, OrderOption};
use printbuddy_db::{Database, DbError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_feedback(text: &str, rating: i64) -> CreateFeedback {
    CreateFeedback {
        name: None,
        email: None,
        feedback: text.to_string(),
        rating,
    }
}

fn make_order(name: &str, service: OrderOption, is_female: bool) -> CreateOrder {
    CreateOrder {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        service,
        file_locator: Locator::new(format!("uploads/1700000000000-{name}.pdf")).unwrap(),
        details: "2 copies, A4".to_string(),
        is_female,
        customer_phone: None,
        amount: price(service, is_female),
    }
}

// ---------------------------------------------------------------------------
// Feedback tests
// ---------------------------------------------------------------------------

/// Insert, fetch by id, count.
pub async fn test_feedback_insert_and_get(db: &dyn Database) {
    let fb = db
        .insert_feedback(&CreateFeedback {
            name: Some("Asha".into()),
            email: Some("asha@example.com".into()),
            feedback: "Great service".into(),
            rating: 5,
        })
        .await
        .unwrap();
    assert!(!fb.id.is_empty());
    assert_eq!(fb.name.as_deref(), Some("Asha"));
    assert_eq!(fb.email.as_deref(), Some("asha@example.com"));
    assert_eq!(fb.feedback, "Great service");
    assert_eq!(fb.rating, 5);

    let fetched = db.get_feedback(&fb.id).await.unwrap();
    assert_eq!(fetched.id, fb.id);
    assert_eq!(fetched.feedback, fb.feedback);
    assert_eq!(db.count_feedback().await.unwrap(), 1);
}

/// Anonymous feedback keeps absent name and email as None.
pub async fn test_feedback_anonymous(db: &dyn Database) {
    let fb = db.insert_feedback(&make_feedback("ok", 3)).await.unwrap();
    let fetched = db.get_feedback(&fb.id).await.unwrap();
    assert_eq!(fetched.name, None);
    assert_eq!(fetched.email, None);
}

/// Each insert gets its own id; list is newest first and honours the limit.
pub async fn test_feedback_listing(db: &dyn Database) {
    let mut ids = Vec::new();
    for (i, text) in ["first", "second", "third"].iter().enumerate() {
        let fb = db
            .insert_feedback(&make_feedback(text, i as i64 + 1))
            .await
            .unwrap();
        ids.push(fb.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_ne!(ids[0], ids[1]);

    let listed = db.list_feedback(10).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].feedback, "third");
    assert_eq!(listed[2].feedback, "first");

    let limited = db.list_feedback(1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, ids[2]);
}

/// A rating outside 1..=5 is refused by the schema and nothing is stored.
pub async fn test_feedback_rating_constraint(db: &dyn Database) {
    let err = db.insert_feedback(&make_feedback("bad", 0)).await.unwrap_err();
    assert!(matches!(err, DbError::Internal(_)));
    assert_eq!(db.count_feedback().await.unwrap(), 0);
}

pub async fn test_feedback_not_found(db: &dyn Database) {
    let err = db.get_feedback("no-such-id").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Order tests
// ---------------------------------------------------------------------------

/// Insert stores every field, including locator, pricing and phone.
pub async fn test_order_insert_and_get(db: &dyn Database) {
    let mut input = make_order("Ravi", OrderOption::Color, true);
    input.customer_phone = Some("+919999999999".into());
    let order = db.insert_order(&input).await.unwrap();

    assert!(!order.id.is_empty());
    assert_eq!(order.name, "Ravi");
    assert_eq!(order.email, "ravi@example.com");
    assert_eq!(order.service, OrderOption::Color);
    assert_eq!(order.file_locator, "uploads/1700000000000-Ravi.pdf");
    assert_eq!(order.details, "2 copies, A4");
    assert!(order.is_female);
    assert_eq!(order.amount, 39);
    assert_eq!(order.customer_phone.as_deref(), Some("+919999999999"));

    let fetched = db.get_order(&order.id).await.unwrap();
    assert_eq!(fetched.id, order.id);
    assert_eq!(fetched.service, order.service);
    assert_eq!(fetched.amount, order.amount);
    assert_eq!(fetched.is_female, order.is_female);
}

/// Every catalog value survives a write and a read.
pub async fn test_order_all_services(db: &dyn Database) {
    for service in [
        OrderOption::Document,
        OrderOption::Poster,
        OrderOption::Bw,
        OrderOption::Color,
    ] {
        let order = db
            .insert_order(&make_order("Svc", service, false))
            .await
            .unwrap();
        let fetched = db.get_order(&order.id).await.unwrap();
        assert_eq!(fetched.service, service);
        assert_eq!(fetched.amount, service.base_price());
    }
    assert_eq!(db.count_orders().await.unwrap(), 4);
}

pub async fn test_order_listing(db: &dyn Database) {
    let first = db
        .insert_order(&make_order("First", OrderOption::Document, false))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = db
        .insert_order(&make_order("Second", OrderOption::Poster, false))
        .await
        .unwrap();

    let listed = db.list_orders(50).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
    assert!(db.list_orders(0).await.unwrap().is_empty());
}

pub async fn test_order_not_found(db: &dyn Database) {
    let err = db.get_order("no-such-id").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
}

/// Orders and feedback live in separate collections.
pub async fn test_records_are_independent(db: &dyn Database) {
    db.insert_feedback(&make_feedback("nice", 4)).await.unwrap();
    db.insert_order(&make_order("Solo", OrderOption::Bw, false))
        .await
        .unwrap();
    assert_eq!(db.count_feedback().await.unwrap(), 1);
    assert_eq!(db.count_orders().await.unwrap(), 1);
}
