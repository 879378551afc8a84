/// 아이템 조회
pub const GET_ITEM: &str = "SELECT id, name, description, category, tier, base_price, current_price, buyer_id, created_at FROM items WHERE id = $1";

/// 아이템 조회 (잠금)
pub const GET_ITEM_FOR_UPDATE: &str = "SELECT id, name, description, category, tier, base_price, current_price, buyer_id, created_at FROM items WHERE id = $1 FOR UPDATE";

/// 모든 아이템 조회
pub const GET_ALL_ITEMS: &str =
    "SELECT id, name, description, category, tier, base_price, current_price, buyer_id, created_at FROM items ORDER BY id";

/// 포지션별 남은 아이템 수
pub const COUNT_REMAINING_IN_CATEGORY: &str =
    "SELECT COUNT(*) AS remaining FROM items WHERE category = $1 AND buyer_id IS NULL";

/// 코치의 포지션별 보유 아이템
pub const GET_ASSIGNMENT: &str = r#"
    SELECT id, name, description, category, tier, base_price, current_price, buyer_id, created_at
    FROM items
    WHERE buyer_id = $1 AND category = $2
    LIMIT 1
"#;

/// 코치 조회
pub const GET_BIDDER: &str =
    "SELECT id, username, name, budget FROM participants WHERE id = $1 AND role = 'bidder'";

/// 모든 코치 조회
pub const GET_ALL_BIDDERS: &str =
    "SELECT id, username, name, budget FROM participants WHERE role = 'bidder' ORDER BY id";

/// 포인트 차감 (잔액이 충분할 때만)
pub const DEDUCT_BUDGET: &str = r#"
    UPDATE participants SET budget = budget - $2
    WHERE id = $1 AND role = 'bidder' AND budget >= $2
    RETURNING budget
"#;

/// 현재 포인트 조회
pub const GET_BUDGET: &str = "SELECT budget FROM participants WHERE id = $1 AND role = 'bidder'";

/// 낙찰 기록 (미낙찰 아이템만)
pub const AWARD_ITEM: &str = r#"
    UPDATE items SET buyer_id = $2, current_price = $3
    WHERE id = $1 AND buyer_id IS NULL
    RETURNING id, name, description, category, tier, base_price, current_price, buyer_id, created_at
"#;

/// 입찰 기록 추가
pub const INSERT_BID: &str =
    "INSERT INTO bids (item_id, bidder_id, amount, bid_time) VALUES ($1, $2, $3, $4)";

/// 아이템 입찰 이력 (최신순)
pub const GET_ITEM_BIDS: &str = r#"
    SELECT item_id, bidder_id, amount, bid_time
    FROM bids
    WHERE item_id = $1
    ORDER BY bid_time DESC
"#;

/// 아이템 이벤트 버전 조회
pub const GET_ITEM_VERSION: &str =
    "SELECT COALESCE(MAX(version), 0) AS version FROM events WHERE aggregate_id = $1";
