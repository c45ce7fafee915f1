//! Listing request parameters.

/// Page size used for every listing request.
pub const DEFAULT_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// `GET /assets` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub for_issuer: Option<String>,
    pub cursor: Option<String>,
    pub limit: u32,
    pub order: Order,
}

impl Default for AssetRequest {
    fn default() -> Self {
        Self {
            for_issuer: None,
            cursor: None,
            limit: DEFAULT_PAGE_LIMIT,
            order: Order::Asc,
        }
    }
}

impl AssetRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", self.limit.to_string()),
            ("order", self.order.as_str().to_string()),
        ];
        if let Some(issuer) = &self.for_issuer {
            query.push(("asset_issuer", issuer.clone()));
        }
        if let Some(cursor) = &self.cursor {
            query.push(("cursor", cursor.clone()));
        }
        query
    }
}

/// `GET /trades` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    pub base_asset_issuer: Option<String>,
    pub cursor: Option<String>,
    pub limit: u32,
    pub order: Order,
}

impl Default for TradeRequest {
    fn default() -> Self {
        Self {
            base_asset_issuer: None,
            cursor: None,
            limit: DEFAULT_PAGE_LIMIT,
            order: Order::Desc,
        }
    }
}

impl TradeRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", self.limit.to_string()),
            ("order", self.order.as_str().to_string()),
        ];
        if let Some(issuer) = &self.base_asset_issuer {
            query.push(("base_asset_issuer", issuer.clone()));
        }
        if let Some(cursor) = &self.cursor {
            query.push(("cursor", cursor.clone()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_request_defaults() {
        let req = TradeRequest::default();
        assert_eq!(
            req.query(),
            vec![("limit", "200".to_string()), ("order", "desc".to_string())]
        );
    }

    #[test]
    fn test_asset_request_with_issuer_and_cursor() {
        let req = AssetRequest {
            for_issuer: Some("GISSUER".to_string()),
            cursor: Some("abc".to_string()),
            ..Default::default()
        };
        let query = req.query();
        assert!(query.contains(&("order", "asc".to_string())));
        assert!(query.contains(&("asset_issuer", "GISSUER".to_string())));
        assert!(query.contains(&("cursor", "abc".to_string())));
    }
}
