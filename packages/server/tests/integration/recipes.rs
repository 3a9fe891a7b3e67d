use serde_json::json;

use crate::common::{TestApp, png_data_url, routes};

mod creation {
    use super::*;

    #[tokio::test]
    async fn author_can_publish_a_recipe() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let egg = app.seed_ingredient("Egg", "pcs").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Fried egg",
                    "text": "Crack, salt, fry.",
                    "cooking_time": 5,
                    "tags": [tags[0]],
                    "ingredients": [
                        {"id": salt, "amount": 1},
                        {"id": egg, "amount": 2},
                    ],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Fried egg");
        assert_eq!(res.body["author"]["username"], "alice");
        assert_eq!(res.body["tags"][0]["slug"], "breakfast");
        assert_eq!(res.body["ingredients"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["is_favorited"], false);
        assert_eq!(res.body["is_in_shopping_cart"], false);
    }

    #[tokio::test]
    async fn amount_of_one_is_accepted() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let id = app
            .create_recipe(&token, "Minimal", &tags[..1], &[(salt, 1)])
            .await;
        assert!(id > 0);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Bad",
                    "text": "Nope.",
                    "cooking_time": 5,
                    "tags": [tags[0]],
                    "ingredients": [{"id": salt, "amount": 0}],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_tag_or_ingredient_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let bad_tag = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Bad", "text": "x", "cooking_time": 5,
                    "tags": [999_999],
                    "ingredients": [{"id": salt, "amount": 1}],
                }),
                &token,
            )
            .await;
        assert_eq!(bad_tag.status, 400);

        let bad_ingredient = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Bad", "text": "x", "cooking_time": 5,
                    "tags": [tags[0]],
                    "ingredients": [{"id": 999_999, "amount": 1}],
                }),
                &token,
            )
            .await;
        assert_eq!(bad_ingredient.status, 400);
    }

    #[tokio::test]
    async fn recipe_with_an_image_serves_it_from_media() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Pretty dish",
                    "text": "Look at it.",
                    "cooking_time": 10,
                    "tags": [tags[0]],
                    "ingredients": [{"id": salt, "amount": 1}],
                    "image": png_data_url(),
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let image_url = res.body["image"].as_str().expect("image URL expected");
        let hash = image_url.rsplit('/').next().unwrap();

        let media = app.get_raw_without_token(&routes::media(hash)).await;
        assert_eq!(media.status(), 200);
        assert_eq!(
            media.headers()["content-type"].to_str().unwrap(),
            "image/png"
        );
        let bytes = media.bytes().await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn failed_creation_does_not_leak_the_image() {
        use sea_orm::ConnectionTrait;

        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        // Break the tag link table so the insert transaction fails after the
        // image has already been written to the store.
        app.db
            .execute_unprepared("ALTER TABLE recipe_tag RENAME TO recipe_tag_detached")
            .await
            .unwrap();

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Doomed dish",
                    "text": "Never makes it.",
                    "cooking_time": 10,
                    "tags": [tags[0]],
                    "ingredients": [{"id": salt, "amount": 1}],
                    "image": png_data_url(),
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(app.stored_image_count(), 0);
    }

    #[tokio::test]
    async fn banned_users_cannot_publish() {
        let app = TestApp::spawn().await;
        let banned = app
            .create_user_with_role("troll", "securepass", "banned")
            .await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Spam", "text": "x", "cooking_time": 5,
                    "tags": [tags[0]],
                    "ingredients": [{"id": salt, "amount": 1}],
                }),
                &banned,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn list_is_public_and_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let first = app
            .create_recipe(&token, "First", &tags[..1], &[(salt, 1)])
            .await;
        let second = app
            .create_recipe(&token, "Second", &tags[..1], &[(salt, 1)])
            .await;

        let res = app.get_without_token(routes::RECIPES).await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data[0]["id"], second);
        assert_eq!(data[1]["id"], first);
    }

    #[tokio::test]
    async fn default_page_size_is_six() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        for i in 0..7 {
            app.create_recipe(&token, &format!("Dish {i}"), &tags[..1], &[(salt, 1)])
                .await;
        }

        let res = app.get_without_token(routes::RECIPES).await;

        assert_eq!(res.body["data"].as_array().unwrap().len(), 6);
        assert_eq!(res.body["pagination"]["total"], 7);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn tag_filter_matches_any_of_the_slugs() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let breakfast = app
            .create_recipe(&token, "Omelette", &tags[..1], &[(salt, 1)])
            .await;
        let lunch = app
            .create_recipe(&token, "Stew", &tags[1..2], &[(salt, 1)])
            .await;
        app.create_recipe(&token, "Roast", &tags[2..3], &[(salt, 1)])
            .await;

        let res = app
            .get_without_token(&format!("{}?tags=breakfast,lunch", routes::RECIPES))
            .await;

        let ids: Vec<i64> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&i64::from(breakfast)));
        assert!(ids.contains(&i64::from(lunch)));
    }

    #[tokio::test]
    async fn author_and_name_filters_narrow_the_list() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        app.create_recipe(&alice, "Alice pie", &tags[..1], &[(salt, 1)])
            .await;
        let bobs = app
            .create_recipe(&bob, "Bob pie", &tags[..1], &[(salt, 1)])
            .await;

        let detail = app.get_without_token(&routes::recipe(bobs)).await;
        let bob_id = detail.body["author"]["id"].as_i64().unwrap();

        let by_author = app
            .get_without_token(&format!("{}?author={bob_id}", routes::RECIPES))
            .await;
        assert_eq!(by_author.body["data"].as_array().unwrap().len(), 1);

        let by_name = app
            .get_without_token(&format!("{}?name=alice", routes::RECIPES))
            .await;
        assert_eq!(by_name.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(by_name.body["data"][0]["name"], "Alice pie");
    }

    #[tokio::test]
    async fn favorited_filter_sees_only_the_callers_favorites() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let liked = app
            .create_recipe(&alice, "Liked", &tags[..1], &[(salt, 1)])
            .await;
        app.create_recipe(&alice, "Ignored", &tags[..1], &[(salt, 1)])
            .await;
        let fav = app
            .post_empty_with_token(&routes::favorite(liked), &alice)
            .await;
        assert_eq!(fav.status, 201);

        let res = app
            .get_with_token(&format!("{}?is_favorited=true", routes::RECIPES), &alice)
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], liked);
        assert_eq!(data[0]["is_favorited"], true);

        // Anonymous callers get an empty page for ownership filters.
        let anon = app
            .get_without_token(&format!("{}?is_favorited=true", routes::RECIPES))
            .await;
        assert_eq!(anon.body["data"].as_array().unwrap().len(), 0);
    }
}

mod updating {
    use super::*;

    #[tokio::test]
    async fn author_can_patch_fields_and_replace_ingredients() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let sugar = app.seed_ingredient("Sugar", "g").await;

        let id = app
            .create_recipe(&token, "Draft", &tags[..1], &[(salt, 1)])
            .await;

        let res = app
            .patch_with_token(
                &routes::recipe(id),
                &json!({
                    "name": "Final",
                    "ingredients": [{"id": sugar, "amount": 50}],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Final");
        let lines = res.body["ingredients"].as_array().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["name"], "Sugar");
        assert_eq!(lines[0]["amount"], 50);
    }

    #[tokio::test]
    async fn null_image_clears_it() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let create = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Pictured", "text": "x", "cooking_time": 5,
                    "tags": [tags[0]],
                    "ingredients": [{"id": salt, "amount": 1}],
                    "image": png_data_url(),
                }),
                &token,
            )
            .await;
        assert_eq!(create.status, 201);
        assert!(create.body["image"].is_string());

        let res = app
            .patch_with_token(&routes::recipe(create.id()), &json!({"image": null}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["image"].is_null());
    }

    #[tokio::test]
    async fn other_users_cannot_modify_a_recipe() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let mallory = app.create_authenticated_user("mallory", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let id = app
            .create_recipe(&alice, "Mine", &tags[..1], &[(salt, 1)])
            .await;

        let res = app
            .patch_with_token(&routes::recipe(id), &json!({"name": "Stolen"}), &mallory)
            .await;
        assert_eq!(res.status, 403);

        let del = app.delete_with_token(&routes::recipe(id), &mallory).await;
        assert_eq!(del.status, 403);
    }

    #[tokio::test]
    async fn admins_may_modify_any_recipe() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let admin = app
            .create_user_with_role("moderator", "securepass", "admin")
            .await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let id = app
            .create_recipe(&alice, "Rude name", &tags[..1], &[(salt, 1)])
            .await;

        let res = app
            .patch_with_token(&routes::recipe(id), &json!({"name": "Moderated"}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Moderated");
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deleting_a_recipe_keeps_cart_rows_with_a_null_reference() {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
        use server::entity::cart_item;

        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let id = app
            .create_recipe(&alice, "Ephemeral", &tags[..1], &[(salt, 1)])
            .await;
        app.add_to_cart(id, &bob).await;

        let res = app.delete_with_token(&routes::recipe(id), &alice).await;
        assert_eq!(res.status, 204);

        let rows = cart_item::Entity::find()
            .filter(cart_item::Column::RecipeId.is_null())
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let gone = app.get_without_token(&routes::recipe(id)).await;
        assert_eq!(gone.status, 404);
    }
}

mod favorites_and_cart {
    use super::*;

    #[tokio::test]
    async fn favoriting_returns_the_short_form_and_flips_the_flag() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let id = app
            .create_recipe(&token, "Tasty", &tags[..1], &[(salt, 1)])
            .await;

        let res = app.post_empty_with_token(&routes::favorite(id), &token).await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["id"], id);
        assert_eq!(res.body["name"], "Tasty");
        assert_eq!(res.body["cooking_time"], 30);

        let detail = app.get_with_token(&routes::recipe(id), &token).await;
        assert_eq!(detail.body["is_favorited"], true);
    }

    #[tokio::test]
    async fn duplicate_membership_changes_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let id = app
            .create_recipe(&token, "Tasty", &tags[..1], &[(salt, 1)])
            .await;

        app.post_empty_with_token(&routes::favorite(id), &token).await;
        let dup = app.post_empty_with_token(&routes::favorite(id), &token).await;
        assert_eq!(dup.status, 400);

        app.add_to_cart(id, &token).await;
        let dup_cart = app.post_empty_with_token(&routes::cart(id), &token).await;
        assert_eq!(dup_cart.status, 400);
    }

    #[tokio::test]
    async fn removing_a_missing_membership_is_an_error() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let id = app
            .create_recipe(&token, "Tasty", &tags[..1], &[(salt, 1)])
            .await;

        let fav = app.delete_with_token(&routes::favorite(id), &token).await;
        assert_eq!(fav.status, 400);

        let cart = app.delete_with_token(&routes::cart(id), &token).await;
        assert_eq!(cart.status, 400);
    }

    #[tokio::test]
    async fn cart_membership_is_per_user() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let id = app
            .create_recipe(&alice, "Shared", &tags[..1], &[(salt, 1)])
            .await;

        app.add_to_cart(id, &alice).await;

        let for_alice = app.get_with_token(&routes::recipe(id), &alice).await;
        assert_eq!(for_alice.body["is_in_shopping_cart"], true);

        let for_bob = app.get_with_token(&routes::recipe(id), &bob).await;
        assert_eq!(for_bob.body["is_in_shopping_cart"], false);
    }
}
