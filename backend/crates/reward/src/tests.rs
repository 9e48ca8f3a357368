//! Unit tests for the reward crate

#[cfg(test)]
mod config_tests {
    use crate::application::config::RewardConfig;
    use crate::domain::value_objects::CommissionStatus;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = RewardConfig::default();
        assert_eq!(config.commission_origin, "Redeemed by commission");
        assert_eq!(config.checkin_origin, "Checkin reward");
        assert_eq!(config.purchase_origin, "Bought by user");
        assert_eq!(config.checkin_amount.value(), 10);
        assert_eq!(config.referral_commission_amount.value(), 100);
        assert_eq!(config.referral_commission_status, CommissionStatus::Completed);
        assert_eq!(config.unit_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_development_config() {
        let config = RewardConfig::development();
        assert_eq!(config.unit_timeout, Duration::from_secs(30));
        assert_ne!(config.token_secret, [0u8; 32]);
    }

    #[test]
    fn test_random_secrets_differ() {
        let a = RewardConfig::with_random_secret();
        let b = RewardConfig::with_random_secret();
        assert_ne!(a.token_secret, b.token_secret);
    }
}

#[cfg(test)]
mod dto_tests {
    use crate::domain::entities::{BalanceChange, RewardRecord};
    use crate::domain::value_objects::{RewardAmount, RewardKind, RewardRecordId};
    use crate::presentation::dto::*;
    use kernel::id::UserId;

    fn change(kind: RewardKind, amount: i64, before: i64, after: i64) -> BalanceChange {
        BalanceChange {
            record: RewardRecord {
                id: RewardRecordId::new(7),
                user_id: UserId::new(),
                amount: RewardAmount::new(amount).unwrap(),
                kind,
                origin: "test".to_string(),
                created_at: chrono::Utc::now(),
            },
            balance_before: RewardAmount::new(before).unwrap(),
            balance_after: RewardAmount::new(after).unwrap(),
        }
    }

    #[test]
    fn test_balance_response_camel_case() {
        let user_id = UserId::new();
        let json = serde_json::to_value(BalanceResponse {
            user_id: user_id.into_uuid(),
            reward_amount: 42,
        })
        .unwrap();

        assert_eq!(json["userId"], user_id.to_string());
        assert_eq!(json["rewardAmount"], 42);
    }

    #[test]
    fn test_record_response_fields() {
        let json = serde_json::to_value(BalanceChangeResponse::from(change(
            RewardKind::Checkin,
            10,
            100,
            110,
        )))
        .unwrap();

        assert_eq!(json["record"]["recordId"], 7);
        assert_eq!(json["record"]["kind"], "Checkin");
        assert_eq!(json["record"]["amount"], 10);
        assert!(json["record"]["createdAt"].is_string());
        assert_eq!(json["balanceBefore"], 100);
        assert_eq!(json["balanceAfter"], 110);
        assert_eq!(json["clamped"], false);
    }

    #[test]
    fn test_clamped_consume_is_flagged() {
        let response = BalanceChangeResponse::from(change(RewardKind::Cost, 50, 0, 0));
        assert!(response.clamped);
        assert_eq!(response.record.amount, 50);
    }

    #[test]
    fn test_purchase_response_flattens_change() {
        let json = serde_json::to_value(PurchaseResponse {
            success: true,
            change: change(RewardKind::Buy, 5, 0, 5).into(),
        })
        .unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["balanceAfter"], 5);
        assert_eq!(json["record"]["kind"], "Buy");
    }

    #[test]
    fn test_requests_deserialize() {
        let consume: ConsumeRequest =
            serde_json::from_str(r#"{"amount": 3, "origin": "gift card"}"#).unwrap();
        assert_eq!(consume.amount, 3);
        assert_eq!(consume.origin, "gift card");

        let referral: ReferralRequest =
            serde_json::from_str(r#"{"referralCode": "ABC123"}"#).unwrap();
        assert_eq!(referral.referral_code, "ABC123");

        // Negative amounts must reach the service
        let purchase: PurchaseRequest = serde_json::from_str(r#"{"amount": -1}"#).unwrap();
        assert_eq!(purchase.amount, -1);
    }

    #[test]
    fn test_referral_response_omits_balance_when_already_paid() {
        let json = serde_json::to_value(ReferralResponse {
            commission_id: None,
            already_paid: true,
            balance_after: None,
        })
        .unwrap();

        assert_eq!(json["alreadyPaid"], true);
        assert!(json["commissionId"].is_null());
        assert!(json.get("balanceAfter").is_none());
    }
}

#[cfg(test)]
mod error_tests {
    use crate::error::RewardError;
    use axum::http::StatusCode;
    use kernel::error::{app_error::AppError, kind::ErrorKind};

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            RewardError::InvalidArgument("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RewardError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            RewardError::ReferralCodeNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RewardError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RewardError::Timeout.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RewardError::Unavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RewardError::Internal("bug".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_errors_are_classified() {
        let err = RewardError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert!(err.is_retryable());

        let err = RewardError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_storage_failures_are_retryable() {
        assert!(RewardError::Timeout.is_retryable());
        assert!(RewardError::Unavailable("down".into()).is_retryable());
        assert!(!RewardError::InvalidArgument("x".into()).is_retryable());
        assert!(!RewardError::UserNotFound.is_retryable());
        assert!(!RewardError::Internal("bug".into()).is_retryable());
    }

    #[test]
    fn test_app_error_conversion() {
        let app: AppError = RewardError::Timeout.into();
        assert_eq!(app.kind(), ErrorKind::ServiceUnavailable);
        assert!(app.action().is_some());

        let app: AppError = RewardError::UserNotFound.into();
        assert_eq!(app.status_code(), 404);
        assert!(app.action().is_none());
    }

    #[test]
    fn test_token_error_maps_to_unauthorized() {
        let err: RewardError = platform::token::TokenError::Expired.into();
        assert!(matches!(err, RewardError::Unauthorized));
    }
}

#[cfg(test)]
mod ledger_tests {
    use crate::application::config::RewardConfig;
    use crate::application::reward_ledger::RewardLedgerService;
    use crate::domain::entities::CommissionOutcome;
    use crate::domain::repository::LedgerStore;
    use crate::domain::value_objects::{CommissionStatus, RewardKind};
    use crate::error::RewardError;
    use crate::infra::memory::{FailPoint, MemoryRewardRepository};
    use kernel::id::UserId;
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(
        balances: &[i64],
    ) -> (
        RewardLedgerService<MemoryRewardRepository>,
        MemoryRewardRepository,
        Vec<UserId>,
    ) {
        let repo = MemoryRewardRepository::new();
        let mut users = Vec::new();
        for (i, balance) in balances.iter().enumerate() {
            let user_id = UserId::new();
            repo.insert_user(user_id, Some(format!("CODE{i}").as_str()), *balance)
                .await
                .unwrap();
            users.push(user_id);
        }
        let service =
            RewardLedgerService::new(Arc::new(repo.clone()), Arc::new(RewardConfig::default()));
        (service, repo, users)
    }

    async fn balance(repo: &MemoryRewardRepository, user_id: &UserId) -> i64 {
        repo.balance(user_id).await.unwrap().value()
    }

    #[tokio::test]
    async fn test_consume_on_empty_balance_clamps() {
        let (service, repo, users) = setup(&[0]).await;

        let change = service.consume_reward(users[0], 50, "test").await.unwrap();
        assert!(change.clamped());
        assert_eq!(change.balance_after.value(), 0);
        assert_eq!(balance(&repo, &users[0]).await, 0);

        let records = service.list_records(users[0]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RewardKind::Cost);
        assert_eq!(records[0].amount.value(), 50);
        assert_eq!(records[0].origin, "test");
    }

    #[tokio::test]
    async fn test_consume_within_balance() {
        let (service, repo, users) = setup(&[80]).await;

        let change = service.consume_reward(users[0], 30, "coupon").await.unwrap();
        assert!(!change.clamped());
        assert_eq!(change.balance_before.value(), 80);
        assert_eq!(balance(&repo, &users[0]).await, 50);
    }

    #[tokio::test]
    async fn test_checkin_adds_to_balance() {
        let (service, repo, users) = setup(&[100]).await;

        let change = service.grant_checkin_reward(users[0], 10).await.unwrap();
        assert_eq!(change.balance_after.value(), 110);
        assert_eq!(balance(&repo, &users[0]).await, 110);

        let records = service.list_records(users[0]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RewardKind::Checkin);
        assert_eq!(records[0].amount.value(), 10);
        assert_eq!(records[0].origin, "Checkin reward");
    }

    #[tokio::test]
    async fn test_purchase_records_buy() {
        let (service, _repo, users) = setup(&[0]).await;

        let change = service.purchase_reward(users[0], 25).await.unwrap();
        assert_eq!(change.balance_after.value(), 25);
        assert_eq!(change.record.kind, RewardKind::Buy);
        assert_eq!(change.record.origin, "Bought by user");
    }

    #[tokio::test]
    async fn test_commission_paid_once() {
        let (service, repo, users) = setup(&[0, 0]).await;
        let (payer, invited) = (users[0], users[1]);

        let first = service
            .award_commission(payer, invited, 20, CommissionStatus::Completed)
            .await
            .unwrap();
        assert!(first.commission_id().is_some());
        assert_eq!(balance(&repo, &invited).await, 20);

        let second = service
            .award_commission(payer, invited, 20, CommissionStatus::Completed)
            .await
            .unwrap();
        assert!(second.is_already_paid());
        assert_eq!(balance(&repo, &invited).await, 20);
        assert_eq!(balance(&repo, &payer).await, 0);

        let records = service.list_records(invited).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RewardKind::Redeemed);
        assert_eq!(records[0].origin, "Redeemed by commission");

        let commissions = repo.commissions().await;
        assert_eq!(commissions.len(), 1);
        assert_eq!(commissions[0].payer_user_id, payer);
        assert_eq!(commissions[0].invited_user_id, invited);
        assert_eq!(commissions[0].amount.value(), 20);
    }

    #[tokio::test]
    async fn test_commission_pair_is_directional() {
        let (service, repo, users) = setup(&[0, 0]).await;

        service
            .award_commission(users[0], users[1], 5, CommissionStatus::Completed)
            .await
            .unwrap();
        let reverse = service
            .award_commission(users[1], users[0], 5, CommissionStatus::Pending)
            .await
            .unwrap();

        assert!(!reverse.is_already_paid());
        assert_eq!(balance(&repo, &users[0]).await, 5);
        assert_eq!(repo.commissions().await[1].status, CommissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected_before_any_write() {
        let (service, repo, users) = setup(&[10, 0]).await;

        let results = [
            service.consume_reward(users[0], -1, "test").await.err(),
            service.grant_checkin_reward(users[0], -1).await.err(),
            service.purchase_reward(users[0], -1).await.err(),
            service
                .award_commission(users[1], users[0], -1, CommissionStatus::Completed)
                .await
                .err(),
        ];
        for err in results {
            assert!(matches!(err, Some(RewardError::InvalidArgument(_))));
        }

        assert_eq!(balance(&repo, &users[0]).await, 10);
        assert!(service.list_records(users[0]).await.unwrap().is_empty());
        assert!(repo.commissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_is_allowed() {
        let (service, repo, users) = setup(&[10]).await;

        service.grant_checkin_reward(users[0], 0).await.unwrap();
        assert_eq!(balance(&repo, &users[0]).await, 10);
        assert_eq!(service.list_records(users[0]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_consume_keeps_origin_verbatim() {
        let (service, _repo, users) = setup(&[10]).await;

        let change = service.consume_reward(users[0], 1, " promo ").await.unwrap();
        assert_eq!(change.record.origin, " promo ");

        let change = service.consume_reward(users[0], 1, "").await.unwrap();
        assert_eq!(change.record.origin, "");

        let records = service.list_records(users[0]).await.unwrap();
        assert_eq!(records[0].origin, " promo ");
        assert_eq!(records[1].origin, "");
    }

    #[tokio::test]
    async fn test_self_commission_paid_once() {
        let (service, repo, users) = setup(&[0]).await;

        let first = service
            .award_commission(users[0], users[0], 10, CommissionStatus::Completed)
            .await
            .unwrap();
        assert!(matches!(first, CommissionOutcome::Paid { .. }));

        let second = service
            .award_commission(users[0], users[0], 10, CommissionStatus::Completed)
            .await
            .unwrap();
        assert!(matches!(second, CommissionOutcome::AlreadyPaid));

        assert_eq!(balance(&repo, &users[0]).await, 10);
        assert_eq!(repo.commissions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let (service, repo, users) = setup(&[0]).await;
        let ghost = UserId::new();

        assert!(matches!(
            service.grant_checkin_reward(ghost, 10).await,
            Err(RewardError::UserNotFound)
        ));
        assert!(matches!(
            service.get_balance(ghost).await,
            Err(RewardError::UserNotFound)
        ));
        assert!(matches!(
            service.list_records(ghost).await,
            Err(RewardError::UserNotFound)
        ));

        // Unknown invited user: no orphan commission fact
        assert!(matches!(
            service
                .award_commission(users[0], ghost, 10, CommissionStatus::Completed)
                .await,
            Err(RewardError::UserNotFound)
        ));
        assert!(repo.commissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_payer_writes_nothing() {
        let (service, repo, users) = setup(&[3]).await;

        let err = service
            .award_commission(UserId::new(), users[0], 10, CommissionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, RewardError::UserNotFound));
        assert_eq!(balance(&repo, &users[0]).await, 3);
        assert!(service.list_records(users[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_after_balance_write_rolls_back() {
        let (service, repo, users) = setup(&[100]).await;

        repo.fail_once(FailPoint::AppendRecord);
        let err = service.grant_checkin_reward(users[0], 10).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(balance(&repo, &users[0]).await, 100);
        assert!(service.list_records(users[0]).await.unwrap().is_empty());

        // The fault fires once; a retry goes through
        service.grant_checkin_reward(users[0], 10).await.unwrap();
        assert_eq!(balance(&repo, &users[0]).await, 110);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_commission() {
        let (service, repo, users) = setup(&[0, 0]).await;

        repo.fail_once(FailPoint::Commit);
        let err = service
            .award_commission(users[0], users[1], 20, CommissionStatus::Completed)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(repo.commissions().await.is_empty());
        assert_eq!(balance(&repo, &users[1]).await, 0);

        let retry = service
            .award_commission(users[0], users[1], 20, CommissionStatus::Completed)
            .await
            .unwrap();
        assert!(matches!(retry, CommissionOutcome::Paid { .. }));
        assert_eq!(balance(&repo, &users[1]).await, 20);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_whole_unit() {
        let (service, repo, users) = setup(&[5]).await;

        repo.fail_once(FailPoint::Begin);
        let err = service.purchase_reward(users[0], 5).await.unwrap_err();
        assert!(matches!(err, RewardError::Unavailable(_)));
        assert_eq!(balance(&repo, &users[0]).await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_unit_times_out_and_rolls_back() {
        let (service, repo, users) = setup(&[100]).await;

        repo.stall_once(FailPoint::AppendRecord);
        let err = service.consume_reward(users[0], 40, "test").await.unwrap_err();
        assert!(matches!(err, RewardError::Timeout));
        assert!(err.is_retryable());
        assert_eq!(balance(&repo, &users[0]).await, 100);
        assert!(service.list_records(users[0]).await.unwrap().is_empty());

        // The abandoned unit released its lock
        let change = tokio::time::timeout(
            Duration::from_secs(1),
            service.consume_reward(users[0], 40, "test"),
        )
        .await
        .expect("unit should not block")
        .unwrap();
        assert_eq!(change.balance_after.value(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_commit_is_not_reported_as_timeout() {
        let (service, repo, users) = setup(&[100]).await;

        // Commit outlasts the unit timeout but still lands
        repo.stall_once(FailPoint::Commit);
        let change = service.consume_reward(users[0], 40, "test").await.unwrap();
        assert_eq!(change.balance_after.value(), 60);
        assert_eq!(balance(&repo, &users[0]).await, 60);
        assert_eq!(service.list_records(users[0]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mixed_sequence_never_goes_negative() {
        let (service, repo, users) = setup(&[0]).await;
        let user = users[0];

        let steps: [(bool, i64); 12] = [
            (false, 5),
            (true, 10),
            (false, 3),
            (false, 30),
            (true, 7),
            (false, 7),
            (false, 1),
            (true, 100),
            (false, 60),
            (false, 60),
            (true, 0),
            (false, 0),
        ];

        let mut expected = 0i64;
        for (credit, amount) in steps {
            let change = if credit {
                service.purchase_reward(user, amount).await.unwrap()
            } else {
                service.consume_reward(user, amount, "test").await.unwrap()
            };
            expected = if credit {
                expected + amount
            } else {
                (expected - amount).max(0)
            };

            assert!(change.balance_after.value() >= 0);
            assert_eq!(change.balance_after.value(), expected);
            assert_eq!(balance(&repo, &user).await, expected);
        }

        let records = service.list_records(user).await.unwrap();
        assert_eq!(records.len(), steps.len());
        let costs = records.iter().filter(|r| r.kind == RewardKind::Cost).count();
        assert_eq!(costs, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumes_on_one_balance() {
        let (service, repo, users) = setup(&[100]).await;
        let user = users[0];

        let handles: Vec<_> = (0..30)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.consume_reward(user, 7, "test").await })
            })
            .collect();

        let mut clamped = 0;
        for handle in handles {
            let change = handle.await.unwrap().unwrap();
            assert!(change.balance_after.value() >= 0);
            if change.clamped() {
                clamped += 1;
            }
        }

        // 14 consumes of 7 fit in 100; the 15th takes the last 2
        assert_eq!(balance(&repo, &user).await, 0);
        assert_eq!(clamped, 16);

        let records = service.list_records(user).await.unwrap();
        assert_eq!(records.len(), 30);
        assert!(records
            .iter()
            .all(|r| r.kind == RewardKind::Cost && r.amount.value() == 7));
    }

    #[tokio::test]
    async fn test_records_replay_to_balance() {
        let (service, repo, users) = setup(&[0, 0]).await;
        let (payer, user) = (users[0], users[1]);

        service.grant_checkin_reward(user, 10).await.unwrap();
        service.purchase_reward(user, 200).await.unwrap();
        service
            .award_commission(payer, user, 30, CommissionStatus::Completed)
            .await
            .unwrap();
        service.consume_reward(user, 75, "shop").await.unwrap();
        service.grant_checkin_reward(payer, 10).await.unwrap();

        let records = service.list_records(user).await.unwrap();
        let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                RewardKind::Checkin,
                RewardKind::Buy,
                RewardKind::Redeemed,
                RewardKind::Cost
            ]
        );
        assert!(records.windows(2).all(|w| w[0].id < w[1].id));
        assert!(records.iter().all(|r| r.user_id == user));

        let replayed = records.iter().fold(0i64, |acc, r| {
            if r.kind.is_credit() {
                acc + r.amount.value()
            } else {
                (acc - r.amount.value()).max(0)
            }
        });
        assert_eq!(replayed, 165);
        assert_eq!(balance(&repo, &user).await, replayed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_commissions_pay_once() {
        let (service, repo, users) = setup(&[0, 0]).await;
        let (payer, invited) = (users[0], users[1]);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .award_commission(payer, invited, 20, CommissionStatus::Completed)
                        .await
                })
            })
            .collect();

        let mut paid = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                CommissionOutcome::Paid { .. } => paid += 1,
                CommissionOutcome::AlreadyPaid => duplicates += 1,
            }
        }

        assert_eq!(paid, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(balance(&repo, &invited).await, 20);
        assert_eq!(repo.commissions().await.len(), 1);
        assert_eq!(service.list_records(invited).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_credits_are_not_lost() {
        let (service, repo, users) = setup(&[0, 0]).await;

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let service = service.clone();
                let user_id = users[i % 2];
                tokio::spawn(async move { service.grant_checkin_reward(user_id, 3).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(balance(&repo, &users[0]).await, 75);
        assert_eq!(balance(&repo, &users[1]).await, 75);
        assert_eq!(service.list_records(users[0]).await.unwrap().len(), 25);
    }
}

#[cfg(test)]
mod router_tests {
    use crate::application::config::RewardConfig;
    use crate::domain::repository::LedgerStore;
    use crate::infra::memory::MemoryRewardRepository;
    use crate::presentation::router::reward_router_generic;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use kernel::id::UserId;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const SECRET: [u8; 32] = [9u8; 32];

    fn config() -> RewardConfig {
        RewardConfig {
            token_secret: SECRET,
            ..RewardConfig::default()
        }
    }

    fn token_for(user_id: &UserId) -> String {
        let expires = chrono::Utc::now().timestamp_millis() + 60_000;
        platform::token::sign_token(user_id.as_uuid().as_bytes(), expires, &SECRET)
    }

    async fn setup() -> (Router, MemoryRewardRepository, UserId, UserId) {
        let repo = MemoryRewardRepository::new();
        let payer = UserId::new();
        let invited = UserId::new();
        repo.insert_user(payer, Some("PAYER1"), 0).await.unwrap();
        repo.insert_user(invited, Some("INVITED1"), 0).await.unwrap();
        (reward_router_generic(repo.clone(), config()), repo, payer, invited)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (app, _repo, _payer, _invited) = setup().await;

        let (status, body) = call(&app, "GET", "/balance", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn test_forged_token_is_unauthorized() {
        let (app, _repo, payer, _invited) = setup().await;
        let expires = chrono::Utc::now().timestamp_millis() + 60_000;
        let forged =
            platform::token::sign_token(payer.as_uuid().as_bytes(), expires, &[1u8; 32]);

        let (status, _) = call(&app, "GET", "/balance", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_balance_and_checkin() {
        let (app, _repo, payer, _invited) = setup().await;
        let token = token_for(&payer);

        let (status, body) = call(&app, "POST", "/checkin", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balanceAfter"], 10);
        assert_eq!(body["record"]["kind"], "Checkin");

        let (status, body) = call(&app, "GET", "/balance", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], payer.to_string());
        assert_eq!(body["rewardAmount"], 10);
    }

    #[tokio::test]
    async fn test_purchase_and_consume() {
        let (app, repo, payer, _invited) = setup().await;
        let token = token_for(&payer);

        let (status, body) = call(
            &app,
            "POST",
            "/purchase",
            Some(&token),
            Some(json!({ "amount": 40 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = call(
            &app,
            "POST",
            "/consume",
            Some(&token),
            Some(json!({ "amount": 15, "origin": "sticker" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balanceAfter"], 25);
        assert_eq!(repo.balance(&payer).await.unwrap().value(), 25);

        let (status, body) = call(&app, "GET", "/records", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["kind"], "Cost");
        assert_eq!(records[1]["origin"], "sticker");
    }

    #[tokio::test]
    async fn test_negative_amount_is_bad_request() {
        let (app, _repo, payer, _invited) = setup().await;
        let token = token_for(&payer);

        let (status, body) = call(
            &app,
            "POST",
            "/purchase",
            Some(&token),
            Some(json!({ "amount": -5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_referral_pays_invited_user_once() {
        let (app, _repo, _payer, invited) = setup().await;
        let token = token_for(&invited);

        let (status, body) = call(
            &app,
            "POST",
            "/referral",
            Some(&token),
            Some(json!({ "referralCode": "PAYER1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyPaid"], false);
        assert!(body["commissionId"].is_number());
        assert_eq!(body["balanceAfter"], 100);

        let (status, body) = call(
            &app,
            "POST",
            "/referral",
            Some(&token),
            Some(json!({ "referralCode": "PAYER1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyPaid"], true);

        let (_, body) = call(&app, "GET", "/balance", Some(&token), None).await;
        assert_eq!(body["rewardAmount"], 100);
    }

    #[tokio::test]
    async fn test_unknown_referral_code() {
        let (app, _repo, _payer, invited) = setup().await;
        let token = token_for(&invited);

        let (status, _) = call(
            &app,
            "POST",
            "/referral",
            Some(&token),
            Some(json!({ "referralCode": "NOPE" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_token_for_unknown_user_is_not_found() {
        let (app, _repo, _payer, _invited) = setup().await;
        let token = token_for(&UserId::new());

        let (status, _) = call(&app, "GET", "/balance", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod migration_tests {
    const SCHEMA: &str = include_str!("../../../../database/migrations/0001_reward_ledger.sql");

    #[test]
    fn test_reward_records_reject_update_and_delete() {
        assert!(SCHEMA.contains("BEFORE UPDATE ON reward_records"));
        assert!(SCHEMA.contains("BEFORE DELETE ON reward_records"));
        // Cascades from a removed user run one trigger level down
        assert!(SCHEMA.contains("pg_trigger_depth() > 1"));
    }

    #[test]
    fn test_schema_accepts_self_pairs_and_any_origin() {
        assert!(SCHEMA.contains("UNIQUE (payer_user_id, invited_user_id)"));
        assert!(!SCHEMA.contains("payer_user_id <> invited_user_id"));
        assert!(!SCHEMA.contains("length(origin)"));
    }
}
