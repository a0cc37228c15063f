// ABOUTME: End-to-end tests for the authorization grant and token exchange engines
// ABOUTME: Covers PKCE, single-use codes, scope/tier narrowing, rotation, and all grant types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{pkce_pair, provision_client, test_harness, REDIRECT_URI};
use lukhas_auth::oauth2::models::{AuthenticatedUser, AuthorizeRequest, TokenRequest};
use lukhas_auth::oauth2::{AuthorizeResponse, ProvisionClientParams};

fn authorize_request(client_id: &str, scope: &str) -> AuthorizeRequest {
    AuthorizeRequest {
        response_type: "code".into(),
        client_id: client_id.into(),
        redirect_uri: REDIRECT_URI.into(),
        scope: Some(scope.into()),
        state: Some("state_xyz".into()),
        nonce: Some("nonce_123".into()),
        code_challenge: None,
        code_challenge_method: None,
    }
}

fn token_request(client_id: &str, client_secret: &str) -> TokenRequest {
    TokenRequest {
        grant_type: "authorization_code".into(),
        code: None,
        redirect_uri: Some(REDIRECT_URI.into()),
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        scope: None,
        refresh_token: None,
        code_verifier: None,
    }
}

fn extract_code(response: AuthorizeResponse) -> (String, Option<String>) {
    match response {
        AuthorizeResponse::Code { code, state } => (code, state),
        other => panic!("expected code response, got {other:?}"),
    }
}

// =============================================================================
// Authorization-code flow
// =============================================================================

#[tokio::test]
async fn test_code_flow_with_pkce_end_to_end() {
    let harness = test_harness();
    let (client, secret) =
        provision_client(&harness.server, &["openid", "profile", "email"], 5).await;
    let user = AuthenticatedUser::new("user_1", 3);
    let (verifier, challenge) = pkce_pair();

    let mut request = authorize_request(&client.client_id, "openid profile email");
    request.code_challenge = Some(challenge);
    request.code_challenge_method = Some("S256".into());

    let response = harness.server.authorize(request, &user).await.unwrap();
    let (code, state) = extract_code(response);
    assert_eq!(state.as_deref(), Some("state_xyz"));

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    exchange.code_verifier = Some(verifier);

    let tokens = harness.server.token(exchange).await.unwrap();
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.expires_in, 3600);
    assert_eq!(tokens.scope.as_deref(), Some("openid profile email"));
    assert!(tokens.refresh_token.is_some());
    // openid was granted, so an ID token rides along
    assert!(tokens.id_token.is_some());
}

#[tokio::test]
async fn test_code_is_single_use() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let request = authorize_request(&client.client_id, "openid");
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code.clone());
    assert!(harness.server.token(exchange).await.is_ok());

    let mut replay = token_request(&client.client_id, &secret);
    replay.code = Some(code);
    let error = harness.server.token(replay).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_pkce_verifier_mutation_fails_and_burns_code() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);
    let (verifier, challenge) = pkce_pair();

    let mut request = authorize_request(&client.client_id, "openid");
    request.code_challenge = Some(challenge);
    request.code_challenge_method = Some("S256".into());
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    // Single-character mutation of the verifier must fail the exchange
    let mut mutated = verifier.clone().into_bytes();
    mutated[0] = if mutated[0] == b'd' { b'e' } else { b'd' };
    let mutated = String::from_utf8(mutated).unwrap();

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code.clone());
    exchange.code_verifier = Some(mutated);
    let error = harness.server.token(exchange).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");

    // The failed verification consumed the code: the correct verifier is
    // now too late
    let mut retry = token_request(&client.client_id, &secret);
    retry.code = Some(code);
    retry.code_verifier = Some(verifier);
    let error = harness.server.token(retry).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_pkce_verifier_required_when_challenge_stored() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);
    let (_, challenge) = pkce_pair();

    let mut request = authorize_request(&client.client_id, "openid");
    request.code_challenge = Some(challenge);
    request.code_challenge_method = Some("S256".into());
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    let error = harness.server.token(exchange).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_pkce_plain_method() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let verifier = "plain-verifier-plain-verifier-plain-verifier-43".to_string();
    let mut request = authorize_request(&client.client_id, "openid");
    request.code_challenge = Some(verifier.clone());
    request.code_challenge_method = Some("plain".into());
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    exchange.code_verifier = Some(verifier);
    assert!(harness.server.token(exchange).await.is_ok());
}

#[tokio::test]
async fn test_redirect_uri_must_match_stored_code() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let request = authorize_request(&client.client_id, "openid");
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    exchange.redirect_uri = Some("https://elsewhere.example/cb".into());
    let error = harness.server.token(exchange).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

// =============================================================================
// Scope and tier policy
// =============================================================================

#[tokio::test]
async fn test_scope_narrowed_by_tier_and_client() {
    let harness = test_harness();
    // Client c1: allowed {openid, profile, email, lukhas:basic}
    let (client, secret) = provision_client(
        &harness.server,
        &["openid", "profile", "email", "lukhas:basic"],
        3,
    )
    .await;
    // Tier-1 user requests an admin scope on top
    let user = AuthenticatedUser::new("user_1", 1);

    let request = authorize_request(&client.client_id, "openid profile email lukhas:admin");
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    let tokens = harness.server.token(exchange).await.unwrap();

    // lukhas:admin stripped: not in the tier-1 table nor the client set
    assert_eq!(tokens.scope.as_deref(), Some("openid profile email"));
}

#[tokio::test]
async fn test_empty_scope_intersection_is_invalid_scope() {
    let harness = test_harness();
    let (client, _secret) = provision_client(&harness.server, &["lukhas:admin"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let request = authorize_request(&client.client_id, "lukhas:admin");
    let error = harness.server.authorize(request, &user).await.unwrap_err();
    assert_eq!(error.error, "invalid_scope");
}

#[tokio::test]
async fn test_superuser_tier_gets_all_supported_scopes() {
    let harness = test_harness();
    let all_scopes = [
        "openid",
        "profile",
        "email",
        "phone",
        "address",
        "lukhas:basic",
        "lukhas:identity:read",
        "lukhas:identity:write",
        "lukhas:premium",
        "lukhas:admin",
    ];
    let (client, secret) = provision_client(&harness.server, &all_scopes, 5).await;
    let user = AuthenticatedUser::new("root_user", 5);

    let request = authorize_request(&client.client_id, &all_scopes.join(" "));
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    let tokens = harness.server.token(exchange).await.unwrap();
    assert_eq!(tokens.scope.as_deref(), Some(all_scopes.join(" ").as_str()));
}

// =============================================================================
// Authorization request validation
// =============================================================================

#[tokio::test]
async fn test_unknown_client_is_invalid_client() {
    let harness = test_harness();
    let user = AuthenticatedUser::new("user_1", 1);

    let request = authorize_request("no_such_client", "openid");
    let error = harness.server.authorize(request, &user).await.unwrap_err();
    assert_eq!(error.error, "invalid_client");
}

#[tokio::test]
async fn test_unregistered_redirect_uri_rejected() {
    let harness = test_harness();
    let (client, _) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let mut request = authorize_request(&client.client_id, "openid");
    request.redirect_uri = "https://evil.example/cb".into();
    let error = harness.server.authorize(request, &user).await.unwrap_err();
    assert_eq!(error.error, "invalid_request");
}

#[tokio::test]
async fn test_unknown_response_type_rejected() {
    let harness = test_harness();
    let (client, _) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let mut request = authorize_request(&client.client_id, "openid");
    request.response_type = "device_code".into();
    let error = harness.server.authorize(request, &user).await.unwrap_err();
    assert_eq!(error.error, "unsupported_response_type");
}

// =============================================================================
// Implicit flows
// =============================================================================

#[tokio::test]
async fn test_implicit_token_flow() {
    let harness = test_harness();
    let (client, _) = provision_client(&harness.server, &["openid", "profile"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let mut request = authorize_request(&client.client_id, "openid profile");
    request.response_type = "token".into();

    match harness.server.authorize(request, &user).await.unwrap() {
        AuthorizeResponse::ImplicitToken {
            access_token,
            token_type,
            expires_in,
            state,
        } => {
            assert!(!access_token.is_empty());
            assert_eq!(token_type, "Bearer");
            assert_eq!(expires_in, 3600);
            assert_eq!(state.as_deref(), Some("state_xyz"));

            // The minted token is introspectable straight away
            let info = harness
                .server
                .introspect(&access_token, &client.client_id)
                .await;
            assert!(info.active);
        }
        other => panic!("expected implicit token response, got {other:?}"),
    }
}

#[tokio::test]
async fn test_implicit_id_token_flow() {
    let harness = test_harness();
    let (client, _) = provision_client(&harness.server, &["openid"], 5).await;
    let user = AuthenticatedUser::new("user_1", 2);

    let mut request = authorize_request(&client.client_id, "openid");
    request.response_type = "id_token".into();

    match harness.server.authorize(request, &user).await.unwrap() {
        AuthorizeResponse::IdToken { id_token, state } => {
            // Three dot-separated JWT segments
            assert_eq!(id_token.split('.').count(), 3);
            assert_eq!(state.as_deref(), Some("state_xyz"));
        }
        other => panic!("expected id_token response, got {other:?}"),
    }
}

// =============================================================================
// Token endpoint: client authentication and grant dispatch
// =============================================================================

#[tokio::test]
async fn test_bad_client_secret_short_circuits() {
    let harness = test_harness();
    let (client, _secret) = provision_client(&harness.server, &["openid"], 5).await;

    let mut exchange = token_request(&client.client_id, "wrong-secret");
    exchange.code = Some("any-code".into());
    let error = harness.server.token(exchange).await.unwrap_err();
    // invalid_client, not invalid_grant: credentials fail before any
    // grant-specific logic runs
    assert_eq!(error.error, "invalid_client");
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;

    let mut request = token_request(&client.client_id, &secret);
    request.grant_type = "urn:ietf:params:oauth:grant-type:device_code".into();
    let error = harness.server.token(request).await.unwrap_err();
    assert_eq!(error.error, "unsupported_grant_type");
}

#[tokio::test]
async fn test_grant_type_not_registered_for_client() {
    let harness = test_harness();
    // Client registered only for the code flow
    let (client, secret) = harness
        .server
        .client_manager()
        .provision_client(ProvisionClientParams {
            client_name: "Code Only".into(),
            redirect_uris: vec![REDIRECT_URI.into()],
            allowed_scopes: vec!["openid".into()],
            grant_types: vec!["authorization_code".into()],
            response_types: vec!["code".into()],
            tier_level: 0,
            trusted: false,
        })
        .await
        .unwrap();

    let mut request = token_request(&client.client_id, &secret);
    request.grant_type = "client_credentials".into();
    let error = harness.server.token(request).await.unwrap_err();
    assert_eq!(error.error, "unauthorized_client");
}

// =============================================================================
// Refresh grant (rotation)
// =============================================================================

#[tokio::test]
async fn test_refresh_token_rotation() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid", "profile"], 5).await;
    let user = AuthenticatedUser::new("user_1", 1);

    let request = authorize_request(&client.client_id, "openid profile");
    let (code, _) = extract_code(harness.server.authorize(request, &user).await.unwrap());

    let mut exchange = token_request(&client.client_id, &secret);
    exchange.code = Some(code);
    let first = harness.server.token(exchange).await.unwrap();
    let first_refresh = first.refresh_token.unwrap();

    let mut refresh = token_request(&client.client_id, &secret);
    refresh.grant_type = "refresh_token".into();
    refresh.refresh_token = Some(first_refresh.clone());
    let second = harness.server.token(refresh).await.unwrap();

    // Same scope and tier carried forward, new refresh token issued
    assert_eq!(second.scope.as_deref(), Some("openid profile"));
    let second_refresh = second.refresh_token.unwrap();
    assert_ne!(first_refresh, second_refresh);

    // The consumed token is gone
    let mut replay = token_request(&client.client_id, &secret);
    replay.grant_type = "refresh_token".into();
    replay.refresh_token = Some(first_refresh);
    let error = harness.server.token(replay).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

#[tokio::test]
async fn test_unknown_refresh_token_is_invalid_grant() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["openid"], 5).await;

    let mut request = token_request(&client.client_id, &secret);
    request.grant_type = "refresh_token".into();
    request.refresh_token = Some("not-a-real-refresh-token".into());
    let error = harness.server.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_grant");
}

// =============================================================================
// Client-credentials grant
// =============================================================================

#[tokio::test]
async fn test_client_credentials_grant() {
    let harness = test_harness();
    let (client, secret) =
        provision_client(&harness.server, &["lukhas:basic", "lukhas:identity:read"], 2).await;

    let mut request = token_request(&client.client_id, &secret);
    request.grant_type = "client_credentials".into();
    request.scope = Some("lukhas:basic lukhas:premium".into());

    let tokens = harness.server.token(request).await.unwrap();
    // Clamped to the client's allowed scopes; client tokens last 24 hours
    // and carry no refresh token
    assert_eq!(tokens.scope.as_deref(), Some("lukhas:basic"));
    assert_eq!(tokens.expires_in, 24 * 3600);
    assert!(tokens.refresh_token.is_none());
    assert!(tokens.id_token.is_none());

    let info = harness
        .server
        .introspect(&tokens.access_token, &client.client_id)
        .await;
    assert!(info.active);
    assert_eq!(info.sub.unwrap(), format!("client:{}", client.client_id));
}

#[tokio::test]
async fn test_client_credentials_no_surviving_scope() {
    let harness = test_harness();
    let (client, secret) = provision_client(&harness.server, &["lukhas:basic"], 2).await;

    let mut request = token_request(&client.client_id, &secret);
    request.grant_type = "client_credentials".into();
    request.scope = Some("lukhas:admin".into());
    let error = harness.server.token(request).await.unwrap_err();
    assert_eq!(error.error, "invalid_scope");
}
