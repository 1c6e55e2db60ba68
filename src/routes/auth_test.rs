use super::*;
use crate::state::test_helpers::test_app_state;

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn creds(username: &str, pin: &str) -> Json<CredentialsBody> {
    Json(CredentialsBody { username: username.into(), pin: pin.into() })
}

#[test]
fn auth_error_to_status_maps_variants() {
    assert_eq!(auth_error_to_status(&AuthError::InvalidPin), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::AccountNotFound), StatusCode::NOT_FOUND);
    assert_eq!(auth_error_to_status(&AuthError::UsernameTaken("a".into())), StatusCode::CONFLICT);
    assert_eq!(auth_error_to_status(&AuthError::MissingCredentials), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_then_login_over_http() {
    let (state, _store) = test_app_state();
    let Json(created) = register(State(state.clone()), creds("alice", "1234")).await.unwrap();
    assert_eq!(created["success"], json!(true));

    let response = login(State(state), creds("alice", "1234")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], created["user_id"]);
    assert_eq!(body["account_exists"], json!(true));
}

#[tokio::test]
async fn failed_login_reports_account_existence() {
    let (state, _store) = test_app_state();
    let _ = register(State(state.clone()), creds("alice", "1234")).await.unwrap();

    let wrong_pin = login(State(state.clone()), creds("alice", "0000")).await;
    assert_eq!(wrong_pin.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(wrong_pin).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid PIN"));
    assert_eq!(body["account_exists"], json!(true));

    let unknown = body_json(login(State(state), creds("zed", "0000")).await).await;
    assert_eq!(unknown["account_exists"], json!(false));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let (state, _store) = test_app_state();
    let _ = register(State(state.clone()), creds("alice", "1234")).await.unwrap();
    let err = register(State(state), creds("alice", "1234")).await.unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.code, "E_DUPLICATE_USERNAME");
}

#[tokio::test]
async fn user_info_includes_presence() {
    let (state, store) = test_app_state();
    store.add_user(4, "dora", None);
    let Json(body) = user_info(State(state.clone()), Path("dora".into())).await.unwrap();
    assert_eq!(body["user"]["id"], json!(4));
    assert_eq!(body["online"], json!(false));
    assert!(body["user"].get("pin_hash").is_none());

    let err = user_info(State(state), Path("nobody".into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}
