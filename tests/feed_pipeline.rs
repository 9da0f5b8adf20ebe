use github_icalendar::config::Config;
use github_icalendar::error::FeedError;
use github_icalendar::feed::{self, Feed};
use github_icalendar::github::Github;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issue_json(full_name: &str, id: u64, number: u64, labels: &[&str]) -> serde_json::Value {
    let labels: Vec<_> = labels.iter().map(|name| json!({ "name": name })).collect();
    json!({
        "id": id,
        "number": number,
        "html_url": format!("https://github.com/{}/issues/{}", full_name, number),
        "state": "open",
        "title": format!("Issue {}", number),
        "body": "Something is off",
        "user": { "login": "octocat", "id": 1 },
        "labels": labels,
        "created_at": "2020-01-01T00:00:00Z",
        "updated_at": "2020-01-02T00:00:00Z",
        "repository_url": format!("https://api.github.com/repos/{}", full_name),
    })
}

fn repo_json(full_name: &str, id: u64) -> serde_json::Value {
    let name = full_name.split('/').nth(1).unwrap();
    json!({ "id": id, "name": name, "full_name": full_name, "has_issues": true })
}

fn config(server: &MockServer, rest: &str) -> Config {
    Config::from_yaml(&format!(
        "api_token: secret\napi_endpoint: {}\n{}",
        server.uri(),
        rest
    ))
    .unwrap()
}

async fn mount_widgets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("acme/widgets", 1)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            issue_json("acme/widgets", 101, 1, &["bug"]),
            issue_json("acme/widgets", 102, 2, &[]),
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn repository_feed_has_one_todo_per_open_issue() {
    let server = MockServer::start().await;
    mount_widgets(&server).await;

    let config = config(&server, "repositories:\n  - repository: acme/widgets\n");
    let github = Github::new(&config.api_endpoint, config.api_token().unwrap()).unwrap();
    let feed = Feed::fetch(&config, &github).await.unwrap();

    assert_eq!(feed.entries.len(), 2);
    assert!(feed
        .entries
        .iter()
        .all(|todo| todo.summary.starts_with("widgets #")));
    assert_eq!(feed.entries[0].uid, "1-101.issue.github.com");
    assert_eq!(feed.entries[0].organizer, "octocat@users.github.com");

    let ics = feed.render();
    assert_eq!(ics.matches("BEGIN:VTODO").count(), 2);
    assert!(ics.contains("\nSUMMARY:widgets #2: Issue 2\n"));
}

#[tokio::test]
async fn label_missing_everywhere_yields_an_empty_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            repo_json("acme/widgets", 1),
            repo_json("acme/gadgets", 2),
        ])))
        .mount(&server)
        .await;
    for repo in ["widgets", "gadgets"] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/{}/labels/wontfix", repo)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;
    }

    let config = config(&server, "labels:\n  - label: wontfix\n");
    let github = Github::new(&config.api_endpoint, config.api_token().unwrap()).unwrap();
    let ics = feed::generate(&config, &github).await.unwrap();

    assert!(ics.starts_with("BEGIN:VCALENDAR"));
    assert!(!ics.contains("BEGIN:VTODO"));
}

#[tokio::test]
async fn labels_within_repositories_only_query_those_repositories() {
    let server = MockServer::start().await;
    mount_widgets(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/labels/bug"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "bug" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(query_param("labels", "bug"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue_json(
            "acme/widgets",
            101,
            1,
            &["bug"]
        )])))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(
        &server,
        "repositories:\n  - repository: acme/widgets\nlabels:\n  - label: bug\n",
    );
    let github = Github::new(&config.api_endpoint, config.api_token().unwrap()).unwrap();
    let feed = Feed::fetch(&config, &github).await.unwrap();

    assert_eq!(feed.entries.len(), 1);
    assert_eq!(feed.entries[0].labels, vec!["bug"]);
}

#[tokio::test]
async fn unknown_repository_aborts_generation() {
    let server = MockServer::start().await;
    mount_widgets(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let config = config(
        &server,
        "repositories:\n  - repository: acme/widgets\n  - repository: acme/missing\n",
    );
    let github = Github::new(&config.api_endpoint, config.api_token().unwrap()).unwrap();
    let err = feed::generate(&config, &github).await.unwrap_err();
    assert!(matches!(err, FeedError::UnknownRepository(name) if name == "acme/missing"));
}

#[tokio::test]
async fn unfiltered_feed_counts_user_issues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("filter", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            issue_json("acme/widgets", 101, 1, &[]),
            issue_json("other/tools", 301, 5, &["question"]),
            issue_json("other/tools", 302, 6, &[]),
        ])))
        .mount(&server)
        .await;

    let config = config(&server, "");
    let github = Github::new(&config.api_endpoint, config.api_token().unwrap()).unwrap();
    let first = feed::generate(&config, &github).await.unwrap();
    let second = feed::generate(&config, &github).await.unwrap();

    assert_eq!(first.matches("BEGIN:VTODO").count(), 3);
    assert!(first.contains("\nSUMMARY:tools #5: Issue 5\n"));
    assert_eq!(first, second);
}
