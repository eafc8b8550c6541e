/**
 * The routes module contains all the tide routes and the logic to fulfill the responses for each
 * route.
 *
 * Modules are nested for cleaner organization here
 */
use serde::Serialize;
use tide::http::mime;
use tide::{Redirect, Request, Response, StatusCode};
use uuid::Uuid;

use crate::api_models::parse_poll_id;
use crate::error::PollError;
use crate::AppState;

pub mod api;
pub mod polls;

/**
 *  GET /
 */
pub async fn index(_req: Request<AppState>) -> tide::Result {
    Ok(Redirect::new("/polls").into())
}

/**
 * Pull the poll id out of the `:id` route parameter
 */
fn requested_poll_id(req: &Request<AppState>) -> Result<Uuid, tide::Error> {
    let raw = req
        .param::<String>("id")
        .map_err(|_| tide::Error::from_str(StatusCode::BadRequest, "No poll id specified"))?;
    parse_poll_id(&raw).map_err(PollError::into_http)
}

fn render<T: Serialize>(req: &Request<AppState>, template: &str, data: &T) -> tide::Result {
    let html = req.state().templates.render(template, data)?;
    Ok(Response::builder(StatusCode::Ok)
        .body(html)
        .content_type(mime::HTML)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{FORWARDED_FOR, FORWARDED_USER};
    use crate::models::{NewPoll, Poll};
    use crate::store::{MemoryStore, PollStore};
    use crate::Settings;

    use async_std::sync::Arc;
    use serde_json::Value;
    use tide::http::{Method, Request as HttpRequest, Response as HttpResponse, Url};

    struct Harness {
        store: Arc<MemoryStore>,
        app: tide::Server<AppState>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let state = AppState::new(store.clone(), &Settings::default())
                .expect("Failed to load templates");
            Self {
                store,
                app: crate::build_app(state),
            }
        }

        async fn poll(&self) -> Poll {
            let new = NewPoll::new("Lunch?", "tyler", &["A".to_string(), "B".to_string()]).unwrap();
            self.store.create(new).await.unwrap()
        }

        async fn send(&self, req: HttpRequest) -> HttpResponse {
            self.app.respond(req).await.unwrap()
        }
    }

    fn request(method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(method, Url::parse(&format!("http://localhost{}", path)).unwrap())
    }

    fn vote_form(poll: &Poll, address: &str, body: &str) -> HttpRequest {
        let mut req = request(Method::Post, &format!("/view/{}", poll.id));
        req.insert_header(FORWARDED_FOR, address);
        req.set_body(body.to_string());
        req.set_content_type(mime::FORM);
        req
    }

    #[async_std::test]
    async fn root_redirects_to_listing() {
        let harness = Harness::new();
        let res = harness.send(request(Method::Get, "/")).await;
        assert_eq!(res.status(), StatusCode::Found);
        assert_eq!(res.header("Location").unwrap().last().as_str(), "/polls");
    }

    #[async_std::test]
    async fn vote_then_repeat_from_same_address() {
        let harness = Harness::new();
        let poll = harness.poll().await;

        let body = format!("choice={}", poll.choices[0].id);
        let res = harness.send(vote_form(&poll, "1.2.3.4", &body)).await;
        assert_eq!(res.status(), StatusCode::Found);
        assert_eq!(
            res.header("Location").unwrap().last().as_str(),
            format!("/view/{}", poll.id)
        );

        let body = format!("choice={}", poll.choices[1].id);
        let mut res = harness.send(vote_form(&poll, "1.2.3.4", &body)).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let html = res.body_string().await.unwrap();
        assert!(html.contains("already voted"));

        let after = harness.store.find(&poll.id).await.unwrap();
        assert_eq!(after.choices[0].count, 1);
        assert_eq!(after.choices[1].count, 0);

        let mut req = request(Method::Get, &format!("/view/{}", poll.id));
        req.insert_header(FORWARDED_FOR, "1.2.3.4");
        let html = harness.send(req).await.body_string().await.unwrap();
        assert!(html.contains("already voted"));

        let mut req = request(Method::Get, &format!("/view/{}", poll.id));
        req.insert_header(FORWARDED_FOR, "5.6.7.8");
        let html = harness.send(req).await.body_string().await.unwrap();
        assert!(!html.contains("already voted"));
    }

    #[async_std::test]
    async fn write_in_through_the_form() {
        let harness = Harness::new();
        let poll = harness.poll().await;

        let res = harness
            .send(vote_form(&poll, "5.6.7.8", "other=Tacos&choice="))
            .await;
        assert_eq!(res.status(), StatusCode::Found);

        let after = harness.store.find(&poll.id).await.unwrap();
        assert_eq!(after.choices.len(), 3);
        assert_eq!(after.choices[2].choice, "Tacos");
        assert_eq!(after.choices[2].count, 1);
        assert!(after.who_voted.contains("5.6.7.8"));
    }

    #[async_std::test]
    async fn vote_errors() {
        let harness = Harness::new();
        let poll = harness.poll().await;

        let res = harness.send(vote_form(&poll, "1.2.3.4", "")).await;
        assert_eq!(res.status(), StatusCode::BadRequest);

        let body = format!("choice={}", Uuid::new_v4());
        let res = harness.send(vote_form(&poll, "1.2.3.4", &body)).await;
        assert_eq!(res.status(), StatusCode::BadRequest);

        let mut missing = poll.clone();
        missing.id = Uuid::new_v4();
        let res = harness.send(vote_form(&missing, "1.2.3.4", "other=C")).await;
        assert_eq!(res.status(), StatusCode::NotFound);

        let mut req = request(Method::Post, "/view/not-a-uuid");
        req.insert_header(FORWARDED_FOR, "1.2.3.4");
        req.set_body("other=C");
        req.set_content_type(mime::FORM);
        assert_eq!(harness.send(req).await.status(), StatusCode::BadRequest);

        assert_eq!(harness.store.find(&poll.id).await.unwrap(), poll);
    }

    #[async_std::test]
    async fn view_and_listing_render() {
        let harness = Harness::new();
        let poll = harness.poll().await;

        let mut res = harness
            .send(request(Method::Get, &format!("/view/{}", poll.id)))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        let html = res.body_string().await.unwrap();
        assert!(html.contains("Lunch?"));
        assert!(html.contains(&format!("http://localhost:8000/view/{}", poll.id)));
        assert!(!html.contains("already voted"));

        let mut req = request(Method::Get, "/polls");
        req.insert_header(FORWARDED_USER, "tyler");
        let mut res = harness.send(req).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let html = res.body_string().await.unwrap();
        assert!(html.contains(&format!("/delete/{}", poll.id)));

        let mut res = harness.send(request(Method::Get, "/polls")).await;
        let html = res.body_string().await.unwrap();
        assert!(!html.contains(&format!("/delete/{}", poll.id)));
    }

    #[async_std::test]
    async fn create_and_delete_through_forms() {
        let harness = Harness::new();

        let mut req = request(Method::Post, "/new");
        req.insert_header(FORWARDED_USER, "tyler");
        req.set_body("title=Dinner&created_by=&choices%5B0%5D=Soup&choices%5B1%5D=&choices%5B2%5D=Salad");
        req.set_content_type(mime::FORM);
        let res = harness.send(req).await;
        assert_eq!(res.status(), StatusCode::Found);

        let polls = harness.store.list().await.unwrap();
        assert_eq!(polls.len(), 1);
        let created = &polls[0];
        assert_eq!(created.title, "Dinner");
        assert_eq!(created.created_by, "tyler");
        let labels: Vec<&str> = created.choices.iter().map(|c| c.choice.as_str()).collect();
        assert_eq!(labels, vec!["Soup", "Salad"]);

        let res = harness
            .send(request(Method::Get, &format!("/delete/{}", created.id)))
            .await;
        assert_eq!(res.status(), StatusCode::Found);
        assert!(harness.store.list().await.unwrap().is_empty());

        let res = harness
            .send(request(Method::Get, &format!("/delete/{}", created.id)))
            .await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[async_std::test]
    async fn json_api() {
        let harness = Harness::new();

        let mut req = request(Method::Put, "/api/v1/polls");
        req.set_body(serde_json::json!({
            "title": "Lunch?",
            "created_by": "tyler",
            "choices": ["A", "B"],
        }));
        let mut res = harness.send(req).await;
        assert_eq!(res.status(), StatusCode::Created);
        let created: Value = res.body_json().await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();
        let choice = created["choices"][1]["id"].as_str().unwrap().to_string();
        assert!(created.get("who_voted").is_none());

        for (address, accepted) in &[("1.2.3.4", true), ("1.2.3.4", false)] {
            let mut req = request(Method::Post, &format!("/api/v1/polls/{}/vote", id));
            req.insert_header(FORWARDED_FOR, *address);
            req.set_body(serde_json::json!({ "choice": choice }));
            let mut res = harness.send(req).await;
            assert_eq!(res.status(), StatusCode::Ok);
            let body: Value = res.body_json().await.unwrap();
            assert_eq!(body["accepted"], *accepted);
            assert_eq!(body["poll"]["choices"][1]["count"], 1);
        }

        let mut res = harness
            .send(request(Method::Get, &format!("/api/v1/polls/{}/results", id)))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        let results: Value = res.body_json().await.unwrap();
        assert_eq!(results["total_votes"], 1);
        assert_eq!(results["most_voted"]["choice"], "B");
        assert_eq!(results["chart"]["series"][0]["data"][1]["value"], 1);

        let res = harness
            .send(request(Method::Get, &format!("/api/v1/polls/{}", Uuid::new_v4())))
            .await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }
}
