mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use uuid::Uuid;

use common::Fixture;
use xeetrack_rust::auth::{generate_jwt_with_secret, AuthContext, AuthState, Claims, Identity};
use xeetrack_rust::database::models::Role;
use xeetrack_rust::session::{DataContext, DataSession};

const SECRET: &str = "auth-context-test-secret";

/// Poll the context until its session matches `want`
async fn wait_for_session(
    context: &DataContext,
    want: impl Fn(Option<&Arc<DataSession>>) -> bool,
) -> Result<Option<Arc<DataSession>>> {
    for _ in 0..200 {
        let session = context.session().await;
        if want(session.as_ref()) {
            return Ok(session);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("data context never reached the expected state")
}

#[tokio::test]
async fn starts_pending_until_resolved() {
    let auth = AuthContext::with_secret(SECRET);
    let state = auth.current();
    assert!(state.loading);
    assert!(!state.is_authenticated);
    assert!(state.user.is_none());

    auth.sign_out();
    assert_eq!(auth.current(), AuthState::signed_out());
}

#[tokio::test]
async fn token_sign_in_sets_the_identity() -> Result<()> {
    let auth = AuthContext::with_secret(SECRET);
    let identity = Identity::new(Uuid::new_v4(), "Maya Manager", Role::Manager);
    let token = generate_jwt_with_secret(&Claims::new(&identity), SECRET)?;

    let signed_in = auth.sign_in_with_token(&token)?;
    assert_eq!(signed_in, identity);
    assert_eq!(auth.current(), AuthState::signed_in(identity));
    Ok(())
}

#[tokio::test]
async fn a_bad_token_signs_out() -> Result<()> {
    let auth = AuthContext::with_secret(SECRET);
    let identity = Identity::new(Uuid::new_v4(), "Eli Employee", Role::Employee);
    auth.sign_in(identity.clone());

    let forged = generate_jwt_with_secret(&Claims::new(&identity), "some-other-secret")?;
    assert!(auth.sign_in_with_token(&forged).is_err());
    assert!(!auth.current().is_authenticated);
    assert!(auth.current().user.is_none());
    Ok(())
}

#[tokio::test]
async fn data_context_follows_auth_transitions() -> Result<()> {
    common::init_tracing();
    let fx = Fixture::new().await?;
    {
        let seed = fx.session(&fx.manager).await?;
        seed.create_project(fx.new_project("Seeded")).await?;
    }

    let auth = AuthContext::with_secret(SECRET);
    let context = Arc::new(DataContext::new(fx.remote()));
    let listener = context.clone().spawn_listener(auth.subscribe());

    // Pending: nothing opened yet
    assert!(context.session().await.is_none());

    auth.sign_in(fx.manager.clone());
    let session = wait_for_session(&context, |s| s.is_some())
        .await?
        .expect("session opened");
    assert_eq!(session.identity(), &fx.manager);
    for _ in 0..200 {
        if !session.collections().await.projects.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(session.collections().await.projects.len(), 1);

    auth.sign_out();
    wait_for_session(&context, |s| s.is_none()).await?;
    for _ in 0..200 {
        if session.collections().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(session.collections().await.is_empty());

    drop(auth);
    listener.await?;
    Ok(())
}

#[tokio::test]
async fn switching_users_opens_a_fresh_session() -> Result<()> {
    let fx = Fixture::new().await?;
    let context = DataContext::new(fx.remote());

    let first = context
        .apply(&AuthState::signed_in(fx.manager.clone()))
        .await
        .expect("manager session");
    let again = context
        .apply(&AuthState::signed_in(fx.manager.clone()))
        .await
        .expect("manager session");
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(first.collections().await.employees.len(), 2);

    let second = context
        .apply(&AuthState::signed_in(fx.employee.clone()))
        .await
        .expect("employee session");
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(first.collections().await.is_empty());
    assert!(second.collections().await.employees.is_empty());

    assert!(context.apply(&AuthState::pending()).await.is_none());
    assert!(context.session().await.is_none());
    Ok(())
}
