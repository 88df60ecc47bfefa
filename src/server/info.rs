//! Canned info topics served under `/api/...`.

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTopic {
    Weather,
    News,
    Employment,
    Market,
    BreninProjects,
    AiStatus,
    Capabilities,
}

impl InfoTopic {
    pub const ALL: [InfoTopic; 7] = [
        InfoTopic::Weather,
        InfoTopic::News,
        InfoTopic::Employment,
        InfoTopic::Market,
        InfoTopic::BreninProjects,
        InfoTopic::AiStatus,
        InfoTopic::Capabilities,
    ];

    pub fn route(&self) -> &'static str {
        match self {
            InfoTopic::Weather => "/api/weather",
            InfoTopic::News => "/api/news",
            InfoTopic::Employment => "/api/employment",
            InfoTopic::Market => "/api/market",
            InfoTopic::BreninProjects => "/api/brenin_projects",
            InfoTopic::AiStatus => "/api/ai-status",
            InfoTopic::Capabilities => "/api/capabilities",
        }
    }

    pub fn body(&self) -> Value {
        match self {
            InfoTopic::Weather => json!({
                "message": "Current weather: 72°F (22°C), sunny with light clouds. Humidity: 45%, Wind: 8 mph from the west. UV Index: 6 (High). Perfect day for outdoor activities!",
                "temperature": 72,
                "condition": "sunny",
                "humidity": 45,
                "windSpeed": 8,
            }),
            InfoTopic::News => json!({
                "message": "Breaking: Scientists achieve breakthrough in quantum computing, potentially revolutionizing AI processing speeds by 1000x. Tech stocks surge as major companies announce quantum partnerships.",
                "category": "technology",
                "timestamp": Utc::now().to_rfc3339(),
            }),
            InfoTopic::Employment => json!({
                "message": "Employment Update: Current rate at 95.8% (up 0.3% from last month). Tech sector leading with 12,000 new positions. Remote work opportunities increased by 25%. Job market remains robust across all sectors.",
                "rate": 95.8,
                "trend": "increasing",
                "topSectors": ["Technology", "Healthcare", "Finance"],
            }),
            InfoTopic::Market => json!({
                "message": "Markets Today: S&P 500 +2.8%, NASDAQ +3.1%, DOW +2.2%. AI and clean energy stocks leading gains. Bitcoin at $45,200 (+4.2%). Strong earnings reports driving optimism.",
                "sp500": "+2.8%",
                "nasdaq": "+3.1%",
                "dow": "+2.2%",
                "bitcoin": "$45,200 (+4.2%)",
            }),
            InfoTopic::BreninProjects => json!({
                "message": "Brenin Technologies Current Projects:\n• Advanced Digital Human AI with DeepSeek integration\n• Real-time conversation processing\n• Multi-modal file handling system\n• Voice recognition & synthesis\n• Enterprise AI solutions\n• Next-gen chatbot frameworks",
                "projects": [
                    "Digital Human AI Platform",
                    "DeepSeek Integration",
                    "Voice AI Systems",
                    "Enterprise Solutions",
                    "Multi-modal Processing",
                ],
                "status": "active_development",
            }),
            InfoTopic::AiStatus => json!({
                "message": "Brenin AI Status: All systems operational. DeepSeek integration active. Processing speed: optimal. Ready to assist with any queries!",
                "status": "operational",
                "uptime": "99.9%",
                "lastUpdate": Utc::now().to_rfc3339(),
            }),
            InfoTopic::Capabilities => json!({
                "message": "My Capabilities:\n• Real-time information retrieval\n• Complex question answering\n• File processing & analysis\n• Multi-language support\n• Code assistance\n• Creative writing\n• Data analysis\n• Problem solving",
                "features": [
                    "Information Retrieval",
                    "Question Answering",
                    "File Processing",
                    "Multi-language Support",
                    "Code Assistance",
                    "Creative Writing",
                    "Data Analysis",
                ],
            }),
        }
    }
}

pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    InfoTopic::ALL.iter().fold(Router::new(), |router, topic| {
        let topic = *topic;
        router.route(topic.route(), get(move || async move { Json(topic.body()) }))
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "server": "Brenin Digital Human Backend",
    }))
}
