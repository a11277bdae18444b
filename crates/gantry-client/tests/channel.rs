// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Secure channel integration tests against the in-process mock server:
//! token caching, response correlation, sequence monotonicity, failure
//! delivery and token renewal.

mod support;

use std::time::Duration;

use gantry_client::codec::services::{
    GetEndpointsRequest, GetEndpointsResponse, Request, Response,
};
use gantry_client::codec::StatusCode;
use gantry_client::{
    ChannelConfig, ChannelState, ClientError, SecureChannel, TransportLimits, UacpTransport,
};

use support::{good_header, MockServer, TEST_ENDPOINT};

async fn open_channel(config: ChannelConfig) -> (SecureChannel, MockServer) {
    let (client_stream, server_stream) = tokio::io::duplex(1 << 16);
    let server = tokio::spawn(MockServer::accept_and_open(server_stream));
    let transport =
        UacpTransport::handshake(Box::new(client_stream), TEST_ENDPOINT, TransportLimits::default())
            .await
            .expect("handshake");
    let channel = SecureChannel::open(transport, config).await.expect("channel open");
    (channel, server.await.unwrap())
}

fn get_endpoints_request(marker: &str) -> Request {
    Request::GetEndpoints(GetEndpointsRequest {
        request_header: Default::default(),
        endpoint_url: Some(marker.to_owned()),
        locale_ids: Vec::new(),
        profile_uris: Vec::new(),
    })
}

fn get_endpoints_response() -> Response {
    Response::GetEndpoints(GetEndpointsResponse {
        response_header: good_header(),
        endpoints: Vec::new(),
    })
}

#[tokio::test]
async fn open_caches_the_security_token() {
    let (channel, _server) = open_channel(ChannelConfig::default()).await;

    assert_eq!(channel.state(), ChannelState::Open);
    let token = channel.security_token().expect("token cached");
    assert_eq!(token.channel_id, 1);
    assert_eq!(token.token_id, 2);
    assert_eq!(token.revised_lifetime, 6_000_000);
}

#[tokio::test]
async fn responses_are_correlated_even_out_of_order() {
    let (channel, mut server) = open_channel(ChannelConfig::default()).await;

    const CONCURRENT: usize = 8;
    let mut callers = Vec::new();
    for i in 0..CONCURRENT {
        let channel = channel.clone();
        callers.push(tokio::spawn(async move {
            let marker = format!("request-{i}");
            let response = channel.send(get_endpoints_request(&marker), None).await?;
            Ok::<(String, Response), ClientError>((marker, response))
        }));
    }

    // Collect all requests, then answer them in reverse order, echoing
    // each request's marker in its response.
    let mut observed = Vec::new();
    for _ in 0..CONCURRENT {
        observed.push(server.recv().await.expect("request"));
    }

    // Outbound sequence numbers are strictly increasing (they follow the
    // OPN exchange, so they start above 1).
    let sequences: Vec<u32> = observed.iter().map(|o| o.sequence_number).collect();
    for pair in sequences.windows(2) {
        assert!(pair[0] < pair[1], "sequence numbers not increasing: {sequences:?}");
    }

    for o in observed.iter().rev() {
        let Request::GetEndpoints(req) = &o.request else {
            panic!("expected GetEndpointsRequest");
        };
        let response = Response::GetEndpoints(GetEndpointsResponse {
            response_header: good_header(),
            endpoints: vec![gantry_client::codec::services::EndpointDescription {
                endpoint_url: req.endpoint_url.clone(),
                ..Default::default()
            }],
        });
        server.respond(*b"MSG", o.request_id, &response).await;
    }

    for caller in callers {
        let (marker, response) = caller.await.unwrap().expect("correlated response");
        let Response::GetEndpoints(res) = response else {
            panic!("wrong response type");
        };
        assert_eq!(res.endpoints[0].endpoint_url.as_deref(), Some(marker.as_str()));
    }
}

#[tokio::test]
async fn pending_requests_fail_once_each_when_transport_drops() {
    let (channel, mut server) = open_channel(ChannelConfig::default()).await;

    const PENDING: usize = 3;
    let mut callers = Vec::new();
    for i in 0..PENDING {
        let channel = channel.clone();
        callers.push(tokio::spawn(async move {
            channel.send(get_endpoints_request(&format!("pending-{i}")), None).await
        }));
    }

    // Absorb the requests, then drop the connection without answering.
    for _ in 0..PENDING {
        server.recv().await.expect("request");
    }
    drop(server);

    for caller in callers {
        let err = caller.await.unwrap().expect_err("pending request must fail");
        assert_eq!(err.status_code(), Some(StatusCode::BAD_SECURE_CHANNEL_CLOSED));
    }
    // The channel is terminal after a transport failure.
    tokio::time::timeout(Duration::from_secs(1), async {
        while channel.state() != ChannelState::Closed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("channel reaches Closed");

    let err = channel.send(get_endpoints_request("after-close"), None).await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::BAD_SECURE_CHANNEL_CLOSED));
}

#[tokio::test]
async fn a_broken_body_fails_only_its_own_request() {
    let (channel, mut server) = open_channel(ChannelConfig::default()).await;

    let first = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.send(get_endpoints_request("broken"), None).await })
    };
    let observed = server.recv().await.expect("request");
    server.respond_raw_payload(observed.request_id, &[0xde, 0xad, 0xbe, 0xef]).await;

    let err = first.await.unwrap().expect_err("undecodable body fails the request");
    assert!(matches!(err, ClientError::Protocol(_)), "got {err}");

    // The channel keeps working for the next request.
    let second = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.send(get_endpoints_request("ok"), None).await })
    };
    let observed = server.recv().await.expect("second request");
    server.respond(*b"MSG", observed.request_id, &get_endpoints_response()).await;
    second.await.unwrap().expect("channel survives a per-request decode failure");
    assert_eq!(channel.state(), ChannelState::Open);
}

#[tokio::test]
async fn renew_swaps_the_token_after_acceptance() {
    let (channel, mut server) = open_channel(ChannelConfig::default()).await;
    assert_eq!(channel.security_token().unwrap().token_id, 2);

    let renewal = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.renew().await })
    };
    server.serve_open(6_000_000).await;
    renewal.await.unwrap().expect("renewal");

    assert_eq!(channel.state(), ChannelState::Open);
    assert_eq!(channel.security_token().unwrap().token_id, 3);
    assert_eq!(channel.stats().renewals(), 1);
}

#[tokio::test]
async fn unanswered_request_times_out_and_frees_its_slot() {
    let config = ChannelConfig::builder()
        .request_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let (channel, mut server) = open_channel(config).await;

    let silent = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.send(get_endpoints_request("silent"), None).await })
    };
    let unanswered = server.recv().await.expect("request");
    let err = silent.await.unwrap().expect_err("request must time out");
    assert_eq!(err.status_code(), Some(StatusCode::BAD_TIMEOUT));
    assert_eq!(channel.stats().timeouts(), 1);

    // A late response for the timed-out slot is dropped; the channel
    // still answers new requests.
    server.respond(*b"MSG", unanswered.request_id, &get_endpoints_response()).await;
    let next = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.send(get_endpoints_request("next"), None).await })
    };
    let observed = server.recv().await.expect("next request");
    server.respond(*b"MSG", observed.request_id, &get_endpoints_response()).await;
    next.await.unwrap().expect("channel usable after timeout");
}

#[tokio::test]
async fn close_is_idempotent_and_rejects_later_sends() {
    let (channel, mut server) = open_channel(ChannelConfig::default()).await;

    channel.close().await.expect("close");
    channel.close().await.expect("second close is a no-op");
    assert_eq!(channel.state(), ChannelState::Closed);

    let err = channel.send(get_endpoints_request("late"), None).await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::BAD_SECURE_CHANNEL_CLOSED));

    // The best-effort CloseSecureChannel arrives at the server.
    let observed = server.recv().await.expect("close record");
    assert_eq!(&observed.message_type, b"CLO");
    let Request::CloseSecureChannel(req) = &observed.request else {
        panic!("expected CloseSecureChannelRequest");
    };
    assert_eq!(req.secure_channel_id, 1);
}
