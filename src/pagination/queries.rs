//! Listings and lookups for the entities the client browses.

use super::paginator::{resolve_references, Paginator, PaginatorBuilder, Reference};
use crate::messages::wire::{field, object};
use crate::messages::FromWire;
use crate::models::{Game, Notification, User};
use crate::network::{RestClient, Result};
use serde_json::{Map, Value};
use tracing::instrument;

const PARTICIPANT_FIELDS: [&str; 3] = ["host", "away", "invited"];
const USERS_TABLE: &str = "users";
const GAMES_TABLE: &str = "games";

fn participant_references() -> Vec<Reference> {
    PARTICIPANT_FIELDS
        .iter()
        .map(|field| Reference::new(*field, USERS_TABLE))
        .collect()
}

fn game_listing(client: &RestClient, endpoint: &str) -> PaginatorBuilder {
    PARTICIPANT_FIELDS
        .iter()
        .fold(PaginatorBuilder::new(client.clone(), endpoint, "games"), |builder, field| {
            builder.reference(*field, USERS_TABLE)
        })
}

/// Games the current user has been invited to
pub fn game_invites(client: &RestClient) -> Paginator<Game> {
    game_listing(client, "/games/invites").authenticated(true).build()
}

/// The current user's games in progress
pub fn ongoing_games(client: &RestClient) -> Paginator<Game> {
    game_listing(client, "/games/ongoing").authenticated(true).build()
}

/// Finished games of any account; no login needed
pub fn completed_games(client: &RestClient, username: &str) -> Paginator<Game> {
    game_listing(client, "/games/completed")
        .param("account", username)
        .build()
}

/// Finished games between the current user and `username`
pub fn common_completed_games(client: &RestClient, username: &str) -> Paginator<Game> {
    game_listing(client, "/games/common_completed")
        .param("account", username)
        .authenticated(true)
        .build()
}

/// The current user's open matchmaking searches
pub fn game_searches(client: &RestClient) -> Paginator<Game> {
    game_listing(client, "/games/searches").authenticated(true).build()
}

pub fn accounts(client: &RestClient) -> Paginator<User> {
    PaginatorBuilder::new(client.clone(), "/accounts/all", "accounts").build()
}

/// The current user's notifications, with their games and players filled in
pub fn notifications(client: &RestClient) -> Paginator<Notification> {
    PARTICIPANT_FIELDS
        .iter()
        .fold(
            PaginatorBuilder::new(client.clone(), "/accounts/notifications", "notifications")
                .reference("game", GAMES_TABLE),
            |builder, field| builder.reference(*field, USERS_TABLE),
        )
        .authenticated(true)
        .build()
}

/// One game. The response is `{"game": ..., "users": ...}`.
#[instrument(level = "debug", skip(client))]
pub async fn get_game(client: &RestClient, id: i64) -> Result<Game> {
    let body = client
        .get(&format!("/games/{}", id), Map::new(), false)
        .await?;
    let obj = object(&body, "game response")?;
    let game = resolve_references(field(obj, "game")?, obj, &participant_references())?;
    Ok(Game::from_wire(&game)?)
}

/// One account by username. Private details are only present for the
/// current user, so the call is authenticated when a session is available.
#[instrument(level = "debug", skip(client))]
pub async fn get_account(client: &RestClient, username: &str) -> Result<User> {
    let mut params = Map::new();
    params.insert("username".to_string(), Value::from(username));
    let authenticated = client.session().is_authenticated();
    let body = client.get("/accounts/account", params, authenticated).await?;
    Ok(User::from_wire(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_references() {
        let refs = participant_references();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.table == "users"));
        assert_eq!(refs[0].field, "host");
    }
}
