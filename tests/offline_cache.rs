use crisis_core::error::ApiError;
use crisis_core::model::{Actor, RawReport, ReportId, ReportStatus, Role, UserId};
use crisis_core::projection::{Action, RoleView};
use crisis_core::reconcile::SyncStatus;
use crisis_core::{App, BearerToken, Config, Effect, Event, FetchScope, Model};
use crux_core::testing::AppTester;
use serde_json::json;

type Tester = AppTester<App, Effect>;

fn raw(id: u64, status: &str, responder: Option<u64>) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("Report {id}"),
        "description": "Water rising in the street",
        "category": "FLOOD",
        "status": status,
        "address": "River Rd",
        "reporterId": 100,
        "reporterName": "Thandi",
        "responderId": responder,
        "responders": 1
    })
}

fn reports(values: Vec<serde_json::Value>) -> Vec<RawReport> {
    serde_json::from_value(serde_json::Value::Array(values)).unwrap()
}

fn boot(app: &Tester, cached: Option<Vec<u8>>) -> Model {
    let mut model = Model::default();
    let update = app.update(
        Event::AppStarted {
            config: Config::default(),
        },
        &mut model,
    );
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::KeyValue(_))));
    app.update(Event::CacheLoaded { result: Ok(cached) }, &mut model);
    model
}

fn sign_in(app: &Tester, model: &mut Model, actor: Actor) {
    app.update(
        Event::SessionStarted {
            token: BearerToken::new("token"),
            actor,
        },
        model,
    );
}

fn has_kv(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::KeyValue(_)))
}

mod hydration_tests {
    use super::*;

    #[test]
    fn test_cache_is_served_before_sign_in() {
        let app = Tester::default();
        let cached = serde_json::to_vec(&json!([raw(1, "PENDING", None), raw(2, "RESOLVED", None)]))
            .unwrap();
        let model = boot(&app, Some(cached));

        assert_eq!(model.cache.len(), 2);
        assert!(!model.cache.is_dirty());

        let view = app.view(&model);
        assert!(view.session.is_none());
        assert!(view.dashboard.is_none());
        assert!(view.map_geojson.contains("FeatureCollection"));
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let app = Tester::default();
        let model = boot(&app, Some(b"not json".to_vec()));
        assert!(model.cache.is_empty());
        assert!(model.cache_loaded);
    }

    #[test]
    fn test_cache_read_failure_is_not_fatal() {
        let app = Tester::default();
        let mut model = Model::default();
        app.update(
            Event::AppStarted {
                config: Config::default(),
            },
            &mut model,
        );
        app.update(
            Event::CacheLoaded {
                result: Err("disk unavailable".into()),
            },
            &mut model,
        );
        assert!(model.cache.is_empty());
        assert!(app.view(&model).error.is_none());
    }

    #[test]
    fn test_invalid_base_url_is_reported() {
        let app = Tester::default();
        let mut model = Model::default();
        app.update(
            Event::AppStarted {
                config: Config {
                    api_base_url: "ftp://reports.example.org".into(),
                    ..Config::default()
                },
            },
            &mut model,
        );
        assert!(model.api_base.is_none());
        assert_eq!(
            app.view(&model).error.unwrap().error_code,
            "VALIDATION_ERROR"
        );

        sign_in(&app, &mut model, Actor::new(100, "Thandi", Role::Citizen));
        let update = app.update(Event::RefreshRequested, &mut model);
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
    }

    #[test]
    fn test_server_list_is_persisted() {
        let app = Tester::default();
        let mut model = boot(&app, None);
        sign_in(&app, &mut model, Actor::new(100, "Thandi", Role::Citizen));

        let update = app.update(
            Event::ReportsFetched {
                scope: FetchScope::All,
                result: Ok(reports(vec![raw(1, "PENDING", None)])),
            },
            &mut model,
        );
        assert!(has_kv(&update.effects));
        assert!(!model.cache.is_dirty());
        assert!(matches!(model.sync, SyncStatus::Fresh { .. }));
    }
}

mod degraded_tests {
    use super::*;

    #[test]
    fn test_failed_refresh_keeps_cache() {
        let app = Tester::default();
        let cached = serde_json::to_vec(&json!([raw(1, "PENDING", None)])).unwrap();
        let mut model = boot(&app, Some(cached));
        sign_in(&app, &mut model, Actor::new(100, "Thandi", Role::Citizen));

        let update = app.update(Event::DashboardOpened, &mut model);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
        assert_eq!(model.sync, SyncStatus::Syncing);

        app.update(
            Event::ReportsFetched {
                scope: FetchScope::All,
                result: Err(ApiError::Transport("connection refused".into())),
            },
            &mut model,
        );
        assert_eq!(model.cache.len(), 1);
        assert!(model.sync.is_degraded());

        let view = app.view(&model);
        assert!(view.sync.message.is_some());
        match view.dashboard {
            Some(RoleView::Citizen(dashboard)) => assert_eq!(dashboard.reports.len(), 1),
            other => panic!("expected citizen dashboard, got {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_backend_rolls_back_start() {
        let app = Tester::default();
        let cached = serde_json::to_vec(&json!([raw(1, "ASSIGNED", Some(7))])).unwrap();
        let mut model = boot(&app, Some(cached));
        sign_in(&app, &mut model, Actor::new(7, "Sipho", Role::Responder));

        app.update(Event::StartRequested { id: ReportId(1) }, &mut model);
        assert_eq!(
            model.cache.find(ReportId(1)).unwrap().status,
            ReportStatus::InProgress
        );
        let mutation_id = model
            .ledger
            .pending(ReportId(1))
            .unwrap()
            .mutation_id
            .clone();

        app.update(
            Event::MutationCompleted {
                id: ReportId(1),
                mutation_id,
                action: Action::Start,
                result: Err(ApiError::Timeout),
            },
            &mut model,
        );
        let report = model.cache.find(ReportId(1)).unwrap();
        assert_eq!(report.status, ReportStatus::Assigned);
        assert_eq!(report.responder_id, Some(UserId(7)));
        assert!(model.sync.is_degraded());

        let error = app.view(&model).error.unwrap();
        assert_eq!(error.error_code, "NETWORK_ERROR");
        assert!(error.is_retryable);
    }

    #[test]
    fn test_responder_assignments_follow_full_list() {
        let app = Tester::default();
        let mut model = boot(&app, None);
        sign_in(&app, &mut model, Actor::new(7, "Sipho", Role::Responder));

        let update = app.update(
            Event::ReportsFetched {
                scope: FetchScope::All,
                result: Ok(reports(vec![raw(1, "ASSIGNED", None), raw(2, "PENDING", None)])),
            },
            &mut model,
        );
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Http(_))));

        app.update(
            Event::ReportsFetched {
                scope: FetchScope::AssignedTo(UserId(7)),
                result: Ok(reports(vec![raw(1, "ASSIGNED", None)])),
            },
            &mut model,
        );
        assert_eq!(
            model.cache.find(ReportId(1)).unwrap().responder_id,
            Some(UserId(7))
        );

        match app.view(&model).dashboard {
            Some(RoleView::Responder(dashboard)) => {
                assert_eq!(dashboard.assigned.len(), 1);
                assert_eq!(dashboard.available.len(), 1);
            }
            other => panic!("expected responder dashboard, got {other:?}"),
        }
    }
}

mod filter_tests {
    use super::*;
    use crisis_core::projection::ReportFilter;

    #[test]
    fn test_status_filter_merges_partial_list() {
        let app = Tester::default();
        let cached =
            serde_json::to_vec(&json!([raw(1, "PENDING", None), raw(2, "RESOLVED", None)])).unwrap();
        let mut model = boot(&app, Some(cached));
        sign_in(&app, &mut model, Actor::new(100, "Thandi", Role::Citizen));

        let update = app.update(
            Event::FilterChanged {
                filter: ReportFilter {
                    status: Some(ReportStatus::Pending),
                    category: None,
                },
            },
            &mut model,
        );
        assert!(update.effects.iter().any(|e| matches!(
            e,
            Effect::Http(request) if request.operation.url.ends_with("/crisis-reports?status=PENDING")
        )));

        app.update(
            Event::ReportsFetched {
                scope: FetchScope::WithStatus(ReportStatus::Pending),
                result: Ok(reports(vec![raw(3, "PENDING", None)])),
            },
            &mut model,
        );
        assert_eq!(model.cache.len(), 3);

        match app.view(&model).dashboard {
            Some(RoleView::Citizen(dashboard)) => assert_eq!(dashboard.reports.len(), 2),
            other => panic!("expected citizen dashboard, got {other:?}"),
        }
    }
}

mod responder_filter_tests {
    use super::*;
    use crisis_core::projection::ReportFilter;

    #[test]
    fn test_filtered_fetch_keeps_own_assignment() {
        let app = Tester::default();
        let cached = serde_json::to_vec(&json!([raw(1, "ASSIGNED", Some(7))])).unwrap();
        let mut model = boot(&app, Some(cached));
        sign_in(&app, &mut model, Actor::new(7, "Sipho", Role::Responder));

        app.update(
            Event::FilterChanged {
                filter: ReportFilter {
                    status: Some(ReportStatus::Assigned),
                    category: None,
                },
            },
            &mut model,
        );
        app.update(
            Event::ReportsFetched {
                scope: FetchScope::WithStatus(ReportStatus::Assigned),
                result: Ok(reports(vec![raw(1, "ASSIGNED", None)])),
            },
            &mut model,
        );

        assert_eq!(
            model.cache.find(ReportId(1)).unwrap().responder_id,
            Some(UserId(7))
        );
        match app.view(&model).dashboard {
            Some(RoleView::Responder(dashboard)) => {
                assert_eq!(dashboard.assigned.len(), 1);
                assert!(dashboard.available.is_empty());
                assert!(dashboard.assigned[0].allowed_actions.contains(&Action::Start));
            }
            other => panic!("expected responder dashboard, got {other:?}"),
        }
    }
}

mod session_tests {
    use super::*;

    #[test]
    fn test_logout_clears_everything() {
        let app = Tester::default();
        let cached = serde_json::to_vec(&json!([raw(1, "PENDING", None)])).unwrap();
        let mut model = boot(&app, Some(cached));
        sign_in(&app, &mut model, Actor::new(1, "Admin", Role::Admin));
        app.update(Event::ReportSelected { id: Some(ReportId(1)) }, &mut model);
        assert!(app.view(&model).selected.is_some());

        let update = app.update(Event::LoggedOut, &mut model);
        assert!(has_kv(&update.effects));
        assert!(model.cache.is_empty());
        assert!(model.session.is_none());
        assert!(model.selected.is_none());

        let view = app.view(&model);
        assert!(view.session.is_none());
        assert!(view.selected.is_none());
    }

    #[test]
    fn test_late_response_after_logout_is_dropped() {
        let app = Tester::default();
        let mut model = boot(&app, None);
        sign_in(&app, &mut model, Actor::new(100, "Thandi", Role::Citizen));
        app.update(Event::LoggedOut, &mut model);

        app.update(
            Event::ReportsFetched {
                scope: FetchScope::All,
                result: Ok(reports(vec![raw(1, "PENDING", None)])),
            },
            &mut model,
        );
        assert!(model.cache.is_empty());
    }

    #[test]
    fn test_refresh_requires_session() {
        let app = Tester::default();
        let mut model = boot(&app, None);
        let update = app.update(Event::RefreshRequested, &mut model);
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
        assert_eq!(app.view(&model).error.unwrap().error_code, "UNAUTHORIZED");
    }
}
