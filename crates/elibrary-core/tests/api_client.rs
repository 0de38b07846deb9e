use chrono::NaiveDate;
use elibrary_core::api::{ApiClient, ApiError};
use elibrary_core::auth::Credential;
use elibrary_core::models::{BookPatch, NewBook};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri())
        .unwrap()
        .with_token(Credential::new("tok-123"))
}

#[tokio::test]
async fn list_and_get_books() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "_id": "b1", "title": "Dune", "author": "Frank Herbert", "genre": "Science Fiction" },
                { "_id": "b2", "title": "Emma", "author": "Jane Austen" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "_id": "b1", "title": "Dune", "publicationDate": "1965-08-01T00:00:00.000Z" }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let books = api.list_books().await.unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[1].display_author(), "Jane Austen");

    let book = api.get_book("b1").await.unwrap();
    assert_eq!(book.display_publication_date(), "Aug 01, 1965");
}

#[tokio::test]
async fn missing_book_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = client(&server).get_book("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn borrow_sends_return_date_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books/b1/borrow"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_json(json!({ "returnDate": "2026-11-01" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Book borrowed successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
    let message = client(&server).borrow_book("b1", date).await.unwrap();
    assert_eq!(message.as_deref(), Some("Book borrowed successfully"));
}

#[tokio::test]
async fn borrow_failure_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books/b1/borrow"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Book is not available"
        })))
        .mount(&server)
        .await;

    let date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
    let err = client(&server).borrow_book("b1", date).await.unwrap_err();
    assert_eq!(err.user_message(), "Book is not available");
}

#[tokio::test]
async fn return_book_posts_to_return_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books/b1/return"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Book returned"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message = client(&server).return_book("b1").await.unwrap();
    assert_eq!(message.as_deref(), Some("Book returned"));
}

#[tokio::test]
async fn catalog_mutations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/books"))
        .and(body_json(json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "description": "Spice",
            "genre": "Science Fiction",
            "publicationDate": "1965-08-01",
            "image": ""
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": { "_id": "b9", "title": "Dune" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/books/b9"))
        .and(body_json(json!({ "genre": "Classic" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/books/b9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let created = api
        .create_book(&NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: "Spice".to_string(),
            genre: "Science Fiction".to_string(),
            publication_date: NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
            image: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(created.unwrap().id.as_deref(), Some("b9"));

    let patch = BookPatch {
        genre: Some("Classic".to_string()),
        ..Default::default()
    };
    assert!(api.update_book("b9", &patch).await.unwrap().is_none());
    api.delete_book("b9").await.unwrap();
}

#[tokio::test]
async fn non_admin_mutation_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/books/b1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "message": "Admins only"
        })))
        .mount(&server)
        .await;

    let err = client(&server).delete_book("b1").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 403, .. }));
}

#[tokio::test]
async fn profile_update_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/getUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "_id": "u1", "name": "Ann", "email": "a@x.com", "role": "member",
                "borrowedBooks": [
                    { "_id": "b1", "title": "Dune", "borrowDate": "2026-10-01", "returnDate": "2026-10-20" }
                ]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/update/u1"))
        .and(body_json(json!({ "name": "Annie", "email": "annie@x.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Profile updated"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/delete/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let profile = api.get_profile().await.unwrap();
    assert_eq!(profile.identity.id, "u1");
    assert_eq!(profile.borrowed_books.len(), 1);
    assert_eq!(profile.borrowed_books[0].display_return_date(), "Oct 20, 2026");

    let message = api.update_profile("u1", "Annie", "annie@x.com").await.unwrap();
    assert_eq!(message.as_deref(), Some("Profile updated"));
    api.delete_account("u1").await.unwrap();
}

#[tokio::test]
async fn register_returns_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/register"))
        .and(body_json(json!({ "name": "Ann", "email": "a@x.com", "password": "Good1!pass" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "Account created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message = client(&server)
        .register("Ann", "a@x.com", "Good1!pass")
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some("Account created"));
}
