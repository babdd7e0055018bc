//! crates/playlist_core/src/access.rs
//!
//! Client-side entitlement gate. This only decides what the user is offered;
//! the backend has to enforce entitlement on its own.

use crate::domain::{DocumentOutline, Topic, VideoStatus};

/// A topic is watchable with a premium subscription, and the first topic always is.
pub fn can_access(topic: &Topic, is_premium: bool) -> bool {
    is_premium || topic.order == 0
}

/// What the user can do with a topic right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicAction {
    Watch { url: String },
    Generating,
    /// No video yet, or the last attempt failed.
    Generate,
    Locked,
}

impl TopicAction {
    pub fn for_topic(topic: &Topic, is_premium: bool) -> Self {
        if !can_access(topic, is_premium) {
            return TopicAction::Locked;
        }
        match topic.video.as_ref() {
            Some(video) if video.status == VideoStatus::Ready => match video.url.as_ref() {
                Some(url) => TopicAction::Watch { url: url.clone() },
                None => TopicAction::Generating,
            },
            Some(video) if video.status == VideoStatus::Generating => TopicAction::Generating,
            _ => TopicAction::Generate,
        }
    }

    pub fn allows_generation(&self) -> bool {
        matches!(self, TopicAction::Generate)
    }
}

/// A topic paired with the gate's verdict, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicView {
    pub topic: Topic,
    pub accessible: bool,
    pub action: TopicAction,
}

pub fn topic_views(outline: &DocumentOutline, is_premium: bool) -> Vec<TopicView> {
    outline
        .sorted_by_order()
        .into_iter()
        .map(|topic| TopicView {
            topic: topic.clone(),
            accessible: can_access(topic, is_premium),
            action: TopicAction::for_topic(topic, is_premium),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Video;

    fn topic(order: u32, video: Option<Video>) -> Topic {
        Topic {
            id: format!("topic-{}", order + 1),
            title: format!("Topic {}", order + 1),
            description: String::new(),
            order,
            is_premium: order > 0,
            video,
        }
    }

    fn video(status: VideoStatus, url: Option<&str>) -> Video {
        Video {
            id: "video-1".to_string(),
            url: url.map(str::to_string),
            status,
            duration_secs: None,
            thumbnail: None,
        }
    }

    #[test]
    fn gate_matches_formula_for_all_combinations() {
        for order in 0..5 {
            for premium in [false, true] {
                let t = topic(order, None);
                assert_eq!(can_access(&t, premium), premium || order == 0);
            }
        }
    }

    #[test]
    fn locked_topic_offers_no_action_even_with_ready_video() {
        let t = topic(2, Some(video(VideoStatus::Ready, Some("https://cdn/v.mp4"))));
        assert_eq!(TopicAction::for_topic(&t, false), TopicAction::Locked);
        assert!(!TopicAction::for_topic(&t, false).allows_generation());
    }

    #[test]
    fn failed_video_can_be_regenerated() {
        let t = topic(0, Some(video(VideoStatus::Error, None)));
        assert_eq!(TopicAction::for_topic(&t, false), TopicAction::Generate);
    }

    #[test]
    fn ready_video_is_watchable() {
        let t = topic(1, Some(video(VideoStatus::Ready, Some("https://cdn/v.mp4"))));
        assert_eq!(
            TopicAction::for_topic(&t, true),
            TopicAction::Watch {
                url: "https://cdn/v.mp4".to_string()
            }
        );
    }

    #[test]
    fn generating_video_blocks_new_request() {
        let t = topic(0, Some(video(VideoStatus::Generating, None)));
        assert_eq!(TopicAction::for_topic(&t, false), TopicAction::Generating);
    }
}
