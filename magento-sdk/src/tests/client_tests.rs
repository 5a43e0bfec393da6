//! Behavioural tests for `MagentoClient`
//!
//! These run the client over an in-memory transport with paused time and
//! a mocked reporter, so retry timing and reporting are checked exactly.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::error::ServiceError;
    use crate::reporting::{ChannelReporter, MockErrorReporter};
    use crate::resilience::{AttemptState, RetryPolicy};
    use crate::services::magento::MagentoClient;
    use crate::tests::support::{merchant, other_integration, Reply, ScriptedTransport};

    fn client_with(
        replies: Vec<Reply>,
        reporter: MockErrorReporter,
    ) -> MagentoClient<ScriptedTransport> {
        MagentoClient::with_transport(ScriptedTransport::new(replies))
            .with_reporter(Arc::new(reporter))
    }

    fn silent_reporter() -> MockErrorReporter {
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report().never();
        reporter
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_order_first_try() {
        let client = client_with(
            vec![Reply::Json(json!({"entity_id": 42, "increment_id": "000000042"}))],
            silent_reporter(),
        );

        let order = client.get_order(42).await.expect("order should be returned");

        assert_eq!(order.entity_id(), Some(42));
        assert_eq!(order.increment_id(), Some("000000042"));
        assert_eq!(client.transport().paths(), vec!["V1/orders/42"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_customer_after_two_not_found() {
        let client = client_with(
            vec![
                Reply::Status(404),
                Reply::Status(404),
                Reply::Json(json!({"id": 7, "email": "jane@example.com"})),
            ],
            silent_reporter(),
        );
        let started = Instant::now();

        let customer = client.get_customer(7).await.expect("customer should be returned");

        assert_eq!(customer.id(), Some(7));
        assert_eq!(client.transport().call_count(), 3);
        for gap in client.transport().gaps() {
            assert!(gap >= Duration::from_millis(2000), "gap {:?}", gap);
            assert!(gap < Duration::from_millis(2100), "gap {:?}", gap);
        }
        assert!(started.elapsed() >= Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_order_server_error_reported_once() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|message, cause| {
                message.contains("hold order")
                    && message.contains("99")
                    && cause.status_code() == Some(500)
            })
            .times(1)
            .return_const(());

        let client = client_with(vec![Reply::Status(500)], reporter);
        let started = Instant::now();

        assert!(!client.hold_order(99).await);
        assert_eq!(client.transport().call_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reported_once() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|message, cause| {
                message.contains("get order")
                    && message.contains("5")
                    && matches!(cause, ServiceError::Exhausted { .. })
            })
            .times(1)
            .return_const(());

        let client = client_with(vec![Reply::Status(404)], reporter);
        let started = Instant::now();

        assert!(client.get_order(5).await.is_none());
        assert_eq!(client.transport().call_count(), 6);
        assert!(started.elapsed() >= Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_not_found_error_has_no_retries() {
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report().times(1).return_const(());

        let client = client_with(vec![Reply::Status(401)], reporter);

        assert!(client.get_customer(3).await.is_none());
        assert_eq!(client.transport().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_yields_sentinel() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|_, cause| cause.status_code().is_none())
            .times(1)
            .return_const(());

        let client = client_with(vec![Reply::Unreachable], reporter);

        assert!(!client.cancel_order(12).await);
        assert_eq!(client.transport().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_post_to_order_endpoints() {
        let client = client_with(vec![Reply::Json(json!(true))], silent_reporter());

        assert!(client.cancel_order(10).await);
        assert!(client.hold_order(11).await);
        assert!(client.unhold_order(12).await);

        let requests = client.transport().requests();
        assert!(requests.iter().all(|r| r.method == reqwest::Method::POST));
        assert_eq!(
            client.transport().paths(),
            vec!["V1/orders/10/cancel", "V1/orders/11/hold", "V1/orders/12/unhold"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_order_twice_issues_two_requests() {
        let client = client_with(vec![Reply::Json(json!(true))], silent_reporter());

        assert!(client.cancel_order(77).await);
        assert!(client.cancel_order(77).await);
        assert_eq!(client.transport().call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_declined_by_body() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|_, cause| matches!(cause, ServiceError::Declined(_)))
            .times(1)
            .return_const(());

        let client = client_with(vec![Reply::Json(json!(false))], reporter);

        assert!(!client.unhold_order(8).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_empty_body_is_success() {
        let client = client_with(vec![Reply::Json(serde_json::Value::Null)], silent_reporter());
        assert!(client.hold_order(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_not_found_retried() {
        let client = client_with(
            vec![Reply::Status(404), Reply::Json(json!(true))],
            silent_reporter(),
        );

        assert!(client.hold_order(500).await);
        assert_eq!(client.transport().call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_transaction_by_gateway_id() {
        let client = client_with(
            vec![Reply::Json(json!({
                "items": [{"transaction_id": 3, "txn_id": "ch_123"}],
                "total_count": 1
            }))],
            silent_reporter(),
        );

        let transaction = client
            .get_transaction("ch_123")
            .await
            .expect("transaction should be returned");
        assert_eq!(transaction.txn_id(), Some("ch_123"));
        assert_eq!(transaction.transaction_id(), Some(3));

        let request = &client.transport().requests()[0];
        assert_eq!(request.path, "V1/transactions");
        assert!(request.query.contains(&(
            "searchCriteria[filter_groups][0][filters][0][field]".to_string(),
            "txn_id".to_string()
        )));
        assert!(request.query.contains(&(
            "searchCriteria[filter_groups][0][filters][0][condition_type]".to_string(),
            "eq".to_string()
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_transaction_no_match_is_not_a_failure() {
        let client = client_with(
            vec![Reply::Json(json!({"items": [], "total_count": 0}))],
            silent_reporter(),
        );

        assert!(client.get_transaction("missing").await.is_none());
        assert_eq!(client.transport().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_transaction_rejects_empty_id() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|_, cause| matches!(cause, ServiceError::Validation(_)))
            .times(1)
            .return_const(());

        let client = client_with(vec![Reply::Json(json!({}))], reporter);

        assert!(client.get_transaction("  ").await.is_none());
        assert_eq!(client.transport().call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_success_body_reported() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|_, cause| matches!(cause, ServiceError::Parsing(_)))
            .times(1)
            .return_const(());

        let client = client_with(vec![Reply::Json(json!({"items": "oops"}))], reporter);

        assert!(client.get_transaction("ch_1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_variant_surfaces_error() {
        let client = client_with(vec![Reply::Status(403)], silent_reporter());

        let err = client.try_get_order(9).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_policy_overrides_default() {
        let mut reporter = MockErrorReporter::new();
        reporter.expect_report().times(1).return_const(());

        let client = client_with(vec![Reply::Status(404)], reporter);
        let started = Instant::now();

        let order = client
            .get_order_with_policy(4, RetryPolicy::new(2, 100))
            .await;

        assert!(order.is_none());
        assert_eq!(client.transport().call_count(), 3);
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_operations_have_independent_budgets() {
        let client = client_with(
            vec![
                Reply::Status(404),
                Reply::Status(404),
                Reply::Json(json!({"entity_id": 1})),
            ],
            silent_reporter(),
        );

        let orders = client.get_orders(&[1, 2]).await;

        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(Option::is_some));
        // Both chains hit the 404s once each before the repeating success
        assert_eq!(client.transport().call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_reported_as_failure() {
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_report()
            .withf(|_, cause| matches!(cause, ServiceError::Cancelled { .. }))
            .times(1)
            .return_const(());

        let token = CancellationToken::new();
        let client = client_with(vec![Reply::Status(404)], reporter).with_cancellation(token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        assert!(client.get_order(31).await.is_none());
        assert_eq!(client.transport().call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_attached_to_client() {
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&transitions);

        let client = client_with(vec![Reply::Json(json!({"id": 1}))], silent_reporter())
            .with_observer(Arc::new(move |state: &AttemptState| {
                log.lock().unwrap().push(state.clone())
            }));

        assert!(client.get_customer(1).await.is_some());
        assert_eq!(
            transitions.lock().unwrap().last(),
            Some(&AttemptState::Success { attempts: 0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_reporter_receives_failure() {
        let (reporter, mut receiver) = ChannelReporter::new();
        let client = MagentoClient::with_transport(ScriptedTransport::new(vec![Reply::Status(500)]))
            .with_reporter(Arc::new(reporter));

        assert!(!client.cancel_order(64).await);

        let report = receiver.recv().await.expect("failure should be reported");
        assert!(report.message.contains("64"));
        assert_eq!(report.status_code, Some(500));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_construction_without_integration_fails() {
        let merchant = merchant("https://shop.example.com", vec![other_integration("SHOPIFY")]);

        let err = MagentoClient::builder()
            .merchant(merchant.clone())
            .build_with_transport(ScriptedTransport::new(vec![]))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("MAGENTO"));

        let err = MagentoClient::builder().merchant(merchant).build().unwrap_err();
        assert!(err.is_configuration());
    }
}
