use serde_json::json;

use crate::common::{TestApp, routes};

mod profiles {
    use super::*;

    #[tokio::test]
    async fn user_list_is_paginated() {
        let app = TestApp::spawn().await;
        for i in 0..8 {
            app.create_authenticated_user(&format!("user{i}"), "securepass")
                .await;
        }

        let res = app
            .get_without_token(&format!("{}?limit=6", routes::USERS))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 6);
        assert_eq!(res.body["pagination"]["total"], 8);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn profile_shows_subscription_state_for_the_caller() {
        let app = TestApp::spawn().await;
        let follower = app.create_authenticated_user("follower", "securepass").await;
        app.create_authenticated_user("author", "securepass").await;
        let author_id = {
            let res = app.get_without_token(routes::USERS).await;
            res.body["data"]
                .as_array()
                .unwrap()
                .iter()
                .find(|u| u["username"] == "author")
                .unwrap()["id"]
                .as_i64()
                .unwrap() as i32
        };

        let before = app.get_with_token(&routes::user(author_id), &follower).await;
        assert_eq!(before.body["is_subscribed"], false);

        let sub = app
            .post_empty_with_token(&routes::subscribe(author_id), &follower)
            .await;
        assert_eq!(sub.status, 201, "{}", sub.text);

        let after = app.get_with_token(&routes::user(author_id), &follower).await;
        assert_eq!(after.body["is_subscribed"], true);
    }
}

mod subscribing {
    use super::*;

    async fn user_id_of(app: &TestApp, username: &str) -> i32 {
        let res = app.get_without_token(routes::USERS).await;
        res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|u| u["username"] == username)
            .unwrap_or_else(|| panic!("no user {username}"))["id"]
            .as_i64()
            .unwrap() as i32
    }

    #[tokio::test]
    async fn cannot_subscribe_to_yourself() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = user_id_of(&app, "alice").await;

        let res = app.post_empty_with_token(&routes::subscribe(id), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn duplicate_subscription_is_rejected() {
        let app = TestApp::spawn().await;
        let follower = app.create_authenticated_user("follower", "securepass").await;
        app.create_authenticated_user("author", "securepass").await;
        let author_id = user_id_of(&app, "author").await;

        let first = app
            .post_empty_with_token(&routes::subscribe(author_id), &follower)
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .post_empty_with_token(&routes::subscribe(author_id), &follower)
            .await;
        assert_eq!(second.status, 400);
        assert_eq!(second.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unsubscribing_without_a_subscription_is_an_error() {
        let app = TestApp::spawn().await;
        let follower = app.create_authenticated_user("follower", "securepass").await;
        app.create_authenticated_user("author", "securepass").await;
        let author_id = user_id_of(&app, "author").await;

        let res = app
            .delete_with_token(&routes::subscribe(author_id), &follower)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn subscription_listing_embeds_author_recipes_and_count() {
        let app = TestApp::spawn().await;
        let follower = app.create_authenticated_user("follower", "securepass").await;
        let author = app.create_authenticated_user("author", "securepass").await;
        let author_id = user_id_of(&app, "author").await;

        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        for i in 0..3 {
            app.create_recipe(&author, &format!("Dish {i}"), &tags[..1], &[(salt, 5)])
                .await;
        }

        let sub = app
            .post_empty_with_token(&routes::subscribe(author_id), &follower)
            .await;
        assert_eq!(sub.status, 201);

        let res = app
            .get_with_token(
                &format!("{}?recipes_limit=2", routes::SUBSCRIPTIONS),
                &follower,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["username"], "author");
        assert_eq!(data[0]["is_subscribed"], true);
        assert_eq!(data[0]["recipes_count"], 3);
        assert_eq!(data[0]["recipes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unsubscribing_removes_the_author_from_the_listing() {
        let app = TestApp::spawn().await;
        let follower = app.create_authenticated_user("follower", "securepass").await;
        app.create_authenticated_user("author", "securepass").await;
        let author_id = user_id_of(&app, "author").await;

        app.post_empty_with_token(&routes::subscribe(author_id), &follower)
            .await;
        let res = app
            .delete_with_token(&routes::subscribe(author_id), &follower)
            .await;
        assert_eq!(res.status, 204);

        let listing = app.get_with_token(routes::SUBSCRIPTIONS, &follower).await;
        assert_eq!(listing.body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn banned_users_cannot_subscribe() {
        let app = TestApp::spawn().await;
        let banned = app
            .create_user_with_role("troll", "securepass", "banned")
            .await;
        app.create_authenticated_user("author", "securepass").await;
        let author_id = user_id_of(&app, "author").await;

        let res = app
            .post_empty_with_token(&routes::subscribe(author_id), &banned)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod subscription_validation {
    use super::*;

    #[tokio::test]
    async fn subscribing_to_a_missing_user_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_empty_with_token(&routes::subscribe(999_999), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn subscription_listing_requires_auth() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::SUBSCRIPTIONS).await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn registration_rejects_extra_whitespace_names() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "email": "alice@example.com",
                    "username": "alice",
                    "password": "securepass",
                    "first_name": "   ",
                    "last_name": "Wonder",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
    }
}
