use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_retrieval();
        self.apply_env_overrides_models();
        self.apply_env_overrides_service();
    }

    fn apply_env_overrides_retrieval(&mut self) {
        if let Ok(v) = std::env::var("DOCQA_CHUNK_SIZE") {
            if let Ok(size) = v.parse::<usize>() {
                self.retrieval.chunk_size = size;
            } else {
                tracing::warn!("ignoring invalid DOCQA_CHUNK_SIZE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCQA_CHUNK_OVERLAP") {
            if let Ok(overlap) = v.parse::<usize>() {
                self.retrieval.chunk_overlap = overlap;
            } else {
                tracing::warn!("ignoring invalid DOCQA_CHUNK_OVERLAP value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCQA_TOP_K") {
            if let Ok(k) = v.parse::<usize>() {
                self.retrieval.top_k = k;
            } else {
                tracing::warn!("ignoring invalid DOCQA_TOP_K value: {v}");
            }
        }
    }

    fn apply_env_overrides_models(&mut self) {
        if let Ok(v) = std::env::var("DOCQA_EMBEDDING_BACKEND") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.backend = kind;
            } else {
                tracing::warn!("ignoring invalid DOCQA_EMBEDDING_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCQA_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("DOCQA_EXTRACTOR_BACKEND") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.extractor.backend = kind;
            } else {
                tracing::warn!("ignoring invalid DOCQA_EXTRACTOR_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCQA_EXTRACTOR_MODEL") {
            self.extractor.model = v;
        }
    }

    fn apply_env_overrides_service(&mut self) {
        if let Ok(v) = std::env::var("DOCQA_SQLITE_PATH") {
            self.storage.sqlite_path = v;
        }
        if let Ok(v) = std::env::var("DOCQA_UPLOAD_DIR") {
            self.storage.upload_dir = v.into();
        }
        if let Ok(v) = std::env::var("DOCQA_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("DOCQA_GATEWAY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.gateway.port = port;
            } else {
                tracing::warn!("ignoring invalid DOCQA_GATEWAY_PORT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCQA_TIMEOUT_ASK") {
            if let Ok(secs) = v.parse::<u64>() {
                self.timeouts.ask_secs = secs;
            } else {
                tracing::warn!("ignoring invalid DOCQA_TIMEOUT_ASK value: {v}");
            }
        }
    }
}
