//! End-to-end scenarios driven through the HTTP routers with the caller header, the same way a
//! front end would use the portal.

mod common {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::{Extension, Router};
    use chrono::{NaiveDate, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use hse_portal::access::{CallerResolver, CALLER_HEADER};
    use hse_portal::compliance::exams::{exam_router, ExamService};
    use hse_portal::compliance::instructions::InstructionService;
    use hse_portal::compliance::notices::{notice_router, NoticeService};
    use hse_portal::compliance::trainings::TrainingService;
    use hse_portal::compliance::{dashboard_router, DashboardService};
    use hse_portal::directory::{
        Department, DepartmentId, DirectoryRepository, Employee, EmployeeId, Identity, IdentityId,
    };
    use hse_portal::store::InMemoryPortalStore;

    pub(super) const PLANT: DepartmentId = DepartmentId(5001);
    pub(super) const KILN: DepartmentId = DepartmentId(5002);
    pub(super) const OFFICE: DepartmentId = DepartmentId(5003);

    /// Plant > Kiln and a separate Office. `lead` manages; `kiln.op` and `clerk` are employees.
    pub(super) fn router() -> Router {
        let store = Arc::new(InMemoryPortalStore::new());
        for (id, name, parent) in [
            (PLANT, "Plant", None),
            (KILN, "Kiln", Some(PLANT)),
            (OFFICE, "Office", None),
        ] {
            store
                .insert_department(Department {
                    id,
                    name: name.to_string(),
                    parent,
                })
                .expect("department");
        }
        for (id, username, group, department) in [
            (5101, "lead", "hse_manager", PLANT),
            (5102, "kiln.op", "employee", KILN),
            (5103, "clerk", "employee", OFFICE),
        ] {
            store
                .insert_identity(Identity {
                    id: IdentityId(id),
                    username: username.to_string(),
                    is_superuser: false,
                    groups: vec![group.to_string()],
                })
                .expect("identity");
            store
                .insert_employee(Employee {
                    id: EmployeeId(id),
                    identity: IdentityId(id),
                    first_name: username.to_string(),
                    last_name: "Tester".to_string(),
                    register: None,
                    department: Some(department),
                    position: None,
                    location: None,
                    phone: String::new(),
                    email: String::new(),
                    is_head: false,
                    photo_key: None,
                    hired_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
                    created_at: Utc::now(),
                })
                .expect("employee");
        }

        let notices = Arc::new(NoticeService::new(store.clone()));
        let trainings = Arc::new(TrainingService::new(store.clone()));
        let instructions = Arc::new(InstructionService::new(store.clone(), 30));
        let dashboard = Arc::new(DashboardService::new(
            notices.clone(),
            trainings,
            instructions,
        ));

        Router::new()
            .merge(notice_router(notices))
            .merge(exam_router(Arc::new(ExamService::new(store.clone()))))
            .merge(dashboard_router(dashboard))
            .layer(Extension(CallerResolver::new(store)))
    }

    pub(super) async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        caller: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CALLER_HEADER, caller);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router dispatch");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json")
        };
        (status, payload)
    }
}

mod notices {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::common::{call, router, PLANT};

    #[tokio::test]
    async fn department_notice_reaches_descendants_and_tracks_acknowledgement() {
        let router = router();
        let (status, notice) = call(
            &router,
            Method::POST,
            "/api/v1/notices",
            "lead",
            Some(json!({
                "title": "Kiln shutdown",
                "content": "Lockout applies from Monday.",
                "scope_kind": "department",
                "departments": [PLANT.0],
                "requires_acknowledgement": true,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(notice["scope"]["scope_kind"], "department");
        let id = notice["id"].as_u64().expect("notice id");

        let (status, feed) = call(&router, Method::GET, "/api/v1/me/notices", "clerk", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(feed, json!([]));

        let (status, dashboard) =
            call(&router, Method::GET, "/api/v1/dashboard", "kiln.op", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["view"], "personal");
        assert_eq!(dashboard["unread_notices"], 1);

        let (_, feed) = call(&router, Method::GET, "/api/v1/me/notices", "kiln.op", None).await;
        assert_eq!(feed[0]["is_unread"], true);
        assert_eq!(feed[0]["is_acknowledged"], false);

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/me/notices/{id}/acknowledge"),
            "kiln.op",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/me/notices/{id}/acknowledge"),
            "clerk",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, dashboard) = call(&router, Method::GET, "/api/v1/dashboard", "lead", None).await;
        assert_eq!(dashboard["view"], "organization");
        assert_eq!(dashboard["notices"]["total_notices"], 1);
        assert_eq!(dashboard["notices"]["unacknowledged_notices"], 1);
    }

    #[tokio::test]
    async fn malformed_scopes_and_wrong_roles_are_rejected() {
        let router = router();
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/v1/notices",
            "lead",
            Some(json!({
                "title": "Broken",
                "content": "",
                "scope_kind": "planet",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["scope_kind"].is_array());

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/v1/notices",
            "kiln.op",
            Some(json!({
                "title": "Not allowed",
                "content": "",
                "scope_kind": "org_wide",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

mod exams {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use super::common::{call, router};

    fn correct_choice(question: &Value) -> u64 {
        question["choices"]
            .as_array()
            .expect("choices")
            .iter()
            .find(|choice| choice["is_correct"] == true)
            .and_then(|choice| choice["id"].as_u64())
            .expect("correct choice")
    }

    #[tokio::test]
    async fn official_exam_runs_start_to_finish_once() {
        let router = router();
        let (status, exam) = call(
            &router,
            Method::POST,
            "/api/v1/exams",
            "lead",
            Some(json!({
                "title": "Lockout basics",
                "kind": "official",
                "scope_kind": "org_wide",
                "pass_score": 2,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let exam_id = exam["id"].as_u64().expect("exam id");

        let (status, exam) = call(
            &router,
            Method::PUT,
            &format!("/api/v1/exams/{exam_id}/questions"),
            "lead",
            Some(json!([
                {
                    "text": "Who removes a lock?",
                    "score": 2,
                    "order": 1,
                    "choices": [
                        { "text": "The person who applied it", "is_correct": true },
                        { "text": "Anyone on shift" }
                    ]
                }
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let right = correct_choice(&exam["questions"][0]);

        let (status, started) = call(
            &router,
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/start"),
            "kiln.op",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let handle = started["handle"].as_str().expect("handle").to_string();

        let (status, step) = call(
            &router,
            Method::GET,
            &format!("/api/v1/attempts/{handle}/questions/1"),
            "kiln.op",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(step["outcome"], "question");
        assert!(step["choices"][0].get("is_correct").is_none());

        let (_, step) = call(
            &router,
            Method::POST,
            &format!("/api/v1/attempts/{handle}/questions/1"),
            "kiln.op",
            Some(json!({ "choice": right })),
        )
        .await;
        assert_eq!(step["outcome"], "finish_required");

        let (status, result) = call(
            &router,
            Method::POST,
            &format!("/api/v1/attempts/{handle}/finish"),
            "kiln.op",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["total_score"], 2);
        assert_eq!(result["is_passed"], true);

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/start"),
            "kiln.op",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &router,
            Method::GET,
            &format!("/api/v1/attempts/{handle}/questions/1"),
            "clerk",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, attempts) = call(
            &router,
            Method::GET,
            &format!("/api/v1/exams/{exam_id}/attempts"),
            "lead",
            None,
        )
        .await;
        assert_eq!(attempts.as_array().map(Vec::len), Some(1));

        let (_, removal) = call(
            &router,
            Method::DELETE,
            &format!("/api/v1/exams/{exam_id}"),
            "lead",
            None,
        )
        .await;
        assert_eq!(removal["removal"], "deactivated");
    }

    #[tokio::test]
    async fn exams_without_questions_and_bad_handles_are_rejected() {
        let router = router();
        let (_, exam) = call(
            &router,
            Method::POST,
            "/api/v1/exams",
            "lead",
            Some(json!({
                "title": "Empty",
                "kind": "practice",
                "scope_kind": "org_wide",
            })),
        )
        .await;
        let exam_id = exam["id"].as_u64().expect("exam id");

        let (status, _) = call(
            &router,
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/start"),
            "clerk",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/v1/attempts/not-a-handle/finish",
            "clerk",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
