// region:    --- Imports
use std::net::SocketAddr;
use std::time::Duration;

// endregion: --- Imports

// region:    --- Coordinator Config
/// 경매 코디네이터 설정
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// 카운트다운 시작값(초). 유효한 입찰마다 이 값으로 초기화된다.
    pub countdown_secs: u32,
    /// 낙찰/유찰 결과를 보여준 뒤 대기 상태로 돌아가기까지의 지연
    pub cooldown: Duration,
    /// 외부 저장소 호출 제한 시간
    pub store_timeout: Duration,
    /// 입찰자 본인이 채우는 포지션. 경매에 올라오지 않는다.
    pub reserved_category: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 10,
            cooldown: Duration::from_secs(3),
            store_timeout: Duration::from_secs(5),
            reserved_category: "MID".to_string(),
        }
    }
}

// endregion: --- Coordinator Config

// region:    --- Config
/// 서버 전체 설정 (환경 변수 기반)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: SocketAddr,
    /// 설정된 경우에만 낙찰 이벤트를 Kafka로 발행한다.
    pub kafka_brokers: Option<String>,
    /// 시작 시 테이블을 지우고 다시 만든다.
    pub reset_database: bool,
    pub coordinator: CoordinatorConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("환경 변수 {0} 가 설정되지 않았습니다.")]
    Missing(&'static str),
    #[error("환경 변수 {name} 값이 올바르지 않습니다: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    /// 환경 변수에서 설정 읽기
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let bind_address = parse_var("BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 8000)))?;
        let kafka_brokers = std::env::var("KAFKA_BROKERS").ok().filter(|b| !b.is_empty());

        let reset_database = parse_var("RESET_DATABASE", false)?;

        let defaults = CoordinatorConfig::default();
        let coordinator = CoordinatorConfig {
            countdown_secs: parse_var("AUCTION_COUNTDOWN_SECS", defaults.countdown_secs)?,
            cooldown: Duration::from_secs(parse_var(
                "AUCTION_COOLDOWN_SECS",
                defaults.cooldown.as_secs(),
            )?),
            store_timeout: Duration::from_millis(parse_var(
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )?),
            reserved_category: std::env::var("RESERVED_CATEGORY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.reserved_category),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_address,
            kafka_brokers,
            reset_database,
            coordinator,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

// endregion: --- Config

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.countdown_secs, 10);
        assert_eq!(config.cooldown, Duration::from_secs(3));
        assert_eq!(config.reserved_category, "MID");
    }

    #[test]
    fn parse_var_falls_back_to_default() {
        let value: u32 = parse_var("AUCTION_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
