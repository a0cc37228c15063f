// ABOUTME: Tests for RFC 7591 dynamic client registration and credential validation
// ABOUTME: Covers redirect URI vetting, registration defaults, and Argon2 secret checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::test_harness;
use lukhas_auth::oauth2::models::ClientRegistrationRequest;
use lukhas_auth::oauth2::ProvisionClientParams;

fn registration_request(redirect_uris: Vec<&str>) -> ClientRegistrationRequest {
    ClientRegistrationRequest {
        redirect_uris: redirect_uris.into_iter().map(String::from).collect(),
        client_name: Some("Example App".into()),
        client_uri: Some("https://app.example".into()),
        grant_types: None,
        response_types: None,
        scope: None,
    }
}

#[tokio::test]
async fn test_registration_happy_path_and_defaults() {
    let harness = test_harness();

    let response = harness
        .server
        .client_manager()
        .register_client(registration_request(vec!["https://app.example/callback"]))
        .await
        .unwrap();

    assert!(response.client_id.starts_with("lukhas_client_"));
    assert!(!response.client_secret.is_empty());
    assert_eq!(response.grant_types, vec!["authorization_code".to_owned()]);
    assert_eq!(response.response_types, vec!["code".to_owned()]);
    assert!(response.client_id_issued_at.is_some());
    assert!(response.client_secret_expires_at.is_some());

    // Stored record: tier 0, untrusted, tier-0 default scopes
    let client = harness
        .server
        .client_manager()
        .get_client(&response.client_id)
        .await
        .unwrap();
    assert_eq!(client.tier_level, 0);
    assert!(!client.trusted);
    assert!(client.allowed_scopes.contains(&"openid".to_owned()));
    assert!(client.allowed_scopes.contains(&"lukhas:basic".to_owned()));
    assert!(!client.allowed_scopes.contains(&"lukhas:admin".to_owned()));
    assert!(client.expires_at.is_some());
}

#[tokio::test]
async fn test_registration_requires_redirect_uris() {
    let harness = test_harness();

    let error = harness
        .server
        .client_manager()
        .register_client(registration_request(vec![]))
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_request");
}

#[tokio::test]
async fn test_registration_rejects_bad_redirect_uris() {
    let harness = test_harness();

    let bad_uris = [
        "https://app.example/cb#fragment",
        "https://*.example/cb",
        "http://app.example/cb", // plain http on a non-loopback host
        "not a uri",
        "",
    ];

    for uri in bad_uris {
        let error = harness
            .server
            .client_manager()
            .register_client(registration_request(vec![uri]))
            .await
            .unwrap_err();
        assert_eq!(error.error, "invalid_request", "accepted bad uri: {uri}");
    }

    // Loopback http and the native-app URN are fine
    for uri in ["http://localhost:3000/cb", "urn:ietf:wg:oauth:2.0:oob"] {
        assert!(
            harness
                .server
                .client_manager()
                .register_client(registration_request(vec![uri]))
                .await
                .is_ok(),
            "rejected good uri: {uri}"
        );
    }
}

#[tokio::test]
async fn test_registration_rejects_unknown_grant_and_response_types() {
    let harness = test_harness();

    let mut request = registration_request(vec!["https://app.example/cb"]);
    request.grant_types = Some(vec!["password".into()]);
    let error = harness
        .server
        .client_manager()
        .register_client(request)
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_request");

    let mut request = registration_request(vec!["https://app.example/cb"]);
    request.response_types = Some(vec!["code token".into()]);
    let error = harness
        .server
        .client_manager()
        .register_client(request)
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_request");
}

#[tokio::test]
async fn test_requested_scope_filtered_to_supported_set() {
    let harness = test_harness();

    let mut request = registration_request(vec!["https://app.example/cb"]);
    request.scope = Some("openid email lukhas:premium not:a:scope".into());
    let response = harness
        .server
        .client_manager()
        .register_client(request)
        .await
        .unwrap();

    let client = harness
        .server
        .client_manager()
        .get_client(&response.client_id)
        .await
        .unwrap();
    assert_eq!(
        client.allowed_scopes,
        vec![
            "openid".to_owned(),
            "email".to_owned(),
            "lukhas:premium".to_owned()
        ]
    );
}

#[tokio::test]
async fn test_registered_secret_validates_and_wrong_secret_fails() {
    let harness = test_harness();

    let response = harness
        .server
        .client_manager()
        .register_client(registration_request(vec!["https://app.example/cb"]))
        .await
        .unwrap();

    let validated = harness
        .server
        .client_manager()
        .validate_client(&response.client_id, &response.client_secret)
        .await
        .unwrap();
    assert_eq!(validated.client_id, response.client_id);

    let error = harness
        .server
        .client_manager()
        .validate_client(&response.client_id, "wrong-secret")
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_client");

    let error = harness
        .server
        .client_manager()
        .validate_client("unknown_client", "whatever")
        .await
        .unwrap_err();
    assert_eq!(error.error, "invalid_client");
}

#[tokio::test]
async fn test_provisioned_client_never_expires() {
    let harness = test_harness();

    let (client, secret) = harness
        .server
        .client_manager()
        .provision_client(ProvisionClientParams {
            client_name: "First Party".into(),
            redirect_uris: vec!["https://lukhas.ai/callback".into()],
            allowed_scopes: vec!["openid".into(), "lukhas:admin".into()],
            grant_types: vec!["authorization_code".into(), "client_credentials".into()],
            response_types: vec!["code".into()],
            tier_level: 5,
            trusted: true,
        })
        .await
        .unwrap();

    assert!(client.trusted);
    assert_eq!(client.tier_level, 5);
    assert!(client.expires_at.is_none());
    assert!(harness
        .server
        .client_manager()
        .validate_client(&client.client_id, &secret)
        .await
        .is_ok());
}
