use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const ANILIST_ENDPOINT: &str = "https://graphql.anilist.co";

const MEDIA_QUERY: &str = r#"
query ($id: Int!) {
  Media(id: $id, type: ANIME) {
    id
    idMal
    title { romaji english }
    description(asHtml: false)
    isAdult
    genres
    duration
    startDate { year month day }
    endDate { year month day }
    averageScore
    stats { scoreDistribution { score amount } }
    nextAiringEpisode { airingAt }
    studios(isMain: true) { nodes { name } }
    characters(perPage: 25, sort: [ROLE, RELEVANCE]) {
      edges {
        node { name { full } }
        voiceActors(language: JAPANESE, sort: [RELEVANCE]) { name { full } }
      }
    }
    staff(perPage: 50) { edges { role node { name { full } } } }
  }
}
"#;

const SEARCH_QUERY: &str = r#"
query ($search: String!) {
  Page(perPage: 5) {
    media(search: $search, type: ANIME) {
      id
      title { romaji english }
    }
  }
}
"#;

#[derive(Debug, Clone)]
pub struct AniListClient {
    client: Client,
}

impl AniListClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let user_agent = format!("animelink/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build AniList HTTP client")?;
        Ok(Self { client })
    }

    /// Fetches one anime by id; `None` when AniList has no such entry.
    pub(crate) async fn fetch_media(&self, id: i32) -> Result<Option<Media>> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "Media")]
            media: Option<Media>,
        }

        let data: Option<Data> = self
            .post_graphql(MEDIA_QUERY, json!({ "id": id }), "media")
            .await?;
        Ok(data.and_then(|d| d.media))
    }

    /// Best search hit for `query`: an exact English or romaji title match
    /// if there is one, else the first result.
    pub(crate) async fn search_id(&self, query: &str) -> Result<Option<i32>> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "Page")]
            page: Option<SearchPage>,
        }

        #[derive(Deserialize)]
        struct SearchPage {
            media: Option<Vec<SearchMedia>>,
        }

        #[derive(Deserialize)]
        struct SearchMedia {
            id: i32,
            title: Option<MediaTitle>,
        }

        let data: Option<Data> = self
            .post_graphql(SEARCH_QUERY, json!({ "search": query }), "search")
            .await?;
        let hits = data
            .and_then(|d| d.page)
            .and_then(|p| p.media)
            .unwrap_or_default();

        let normalized = query.trim().to_lowercase();
        let exact = hits.iter().find(|m| {
            m.title.as_ref().is_some_and(|t| {
                [t.english.as_deref(), t.romaji.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|s| s.trim().to_lowercase() == normalized)
            })
        });
        Ok(exact.or_else(|| hits.first()).map(|m| m.id))
    }

    /// Posts a GraphQL request. A 404 answer maps to `Ok(None)`.
    async fn post_graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        what: &str,
    ) -> Result<Option<T>> {
        #[derive(Deserialize)]
        struct GraphQlResponse<T> {
            data: Option<T>,
            errors: Option<Vec<GraphQlError>>,
        }

        #[derive(Deserialize)]
        struct GraphQlError {
            message: String,
            status: Option<i32>,
        }

        let body = json!({ "query": query, "variables": variables });
        let res = self
            .client
            .post(ANILIST_ENDPOINT)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("AniList {} request failed", what))?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("Failed to read AniList {} body", what))?;
        if !status.is_success() {
            return Err(anyhow!(
                "AniList {} HTTP error (status {}): {}",
                what,
                status,
                String::from_utf8_lossy(&bytes)
            ));
        }

        let parsed: GraphQlResponse<T> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse AniList {} JSON", what))?;
        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            if errors.iter().all(|e| e.status == Some(404)) {
                return Ok(None);
            }
            let msg = errors
                .into_iter()
                .map(|e| match e.status {
                    Some(s) => format!("{} (status {})", e.message, s),
                    None => e.message,
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(anyhow!("AniList {} GraphQL error: {}", what, msg));
        }
        Ok(parsed.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Media {
    pub(crate) id: i32,
    pub(crate) id_mal: Option<i32>,
    pub(crate) title: Option<MediaTitle>,
    pub(crate) description: Option<String>,
    pub(crate) is_adult: Option<bool>,
    pub(crate) genres: Option<Vec<String>>,
    pub(crate) duration: Option<i32>,
    pub(crate) start_date: Option<FuzzyDate>,
    pub(crate) end_date: Option<FuzzyDate>,
    pub(crate) average_score: Option<i32>,
    pub(crate) stats: Option<MediaStats>,
    pub(crate) next_airing_episode: Option<AiringEpisode>,
    pub(crate) studios: Option<StudioConnection>,
    pub(crate) characters: Option<CharacterConnection>,
    pub(crate) staff: Option<StaffConnection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MediaTitle {
    pub(crate) romaji: Option<String>,
    pub(crate) english: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FuzzyDate {
    pub(crate) year: Option<i32>,
    pub(crate) month: Option<u32>,
    pub(crate) day: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaStats {
    pub(crate) score_distribution: Option<Vec<ScoreBucket>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreBucket {
    pub(crate) amount: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AiringEpisode {
    pub(crate) airing_at: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudioConnection {
    pub(crate) nodes: Option<Vec<StudioNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudioNode {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CharacterConnection {
    pub(crate) edges: Option<Vec<CharacterEdge>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CharacterEdge {
    pub(crate) node: Option<NamedNode>,
    pub(crate) voice_actors: Option<Vec<NamedNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffConnection {
    pub(crate) edges: Option<Vec<StaffEdge>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffEdge {
    pub(crate) role: Option<String>,
    pub(crate) node: Option<NamedNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedNode {
    pub(crate) name: Option<Name>,
}

impl NamedNode {
    pub(crate) fn full_name(self) -> Option<String> {
        self.name
            .and_then(|n| n.full)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Name {
    pub(crate) full: Option<String>,
}
