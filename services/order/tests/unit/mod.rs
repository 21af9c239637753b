pub(crate) mod model;
mod network;
mod usecase;

use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::{Duration, Local as LocalTime};
use rust_decimal::Decimal;

use marketplace_common::confidentiality::AbstractConfidentiality;
use marketplace_common::config::{
    AppBasepathCfg, AppCfgHardLimit, AppConfig, AppInMemoryDbCfg,
};
use marketplace_common::error::AppConfidentialityError;
use marketplace_common::logging::AppLogContext;

use marketplace_order::api::web::dto::{OrderCreateReqDto, OrderItemReqDto, ShippingAddressDto};
use marketplace_order::constant::{app_meta, hard_limit};
use marketplace_order::datastore::{AbstInMemoryDStore, AppInMemoryDStore};
use marketplace_order::error::AppError;
use marketplace_order::model::{ProductPriceModel, ProductPriceModelSet};
use marketplace_order::{
    AppAuthClaimPermission, AppAuthPermissionCode, AppAuthedClaim, AppSharedState,
};

pub(crate) const EXAMPLE_REL_PATH: &str = "/tests/unit/examples/";

pub(crate) struct MockConfidential {}

impl AbstractConfidentiality for MockConfidential {
    fn try_get_payload(&self, _id: &str) -> DefaultResult<String, AppConfidentialityError> {
        Ok("unit-test".to_string())
    }
}

pub(crate) fn ut_setup_share_state(
    cfg_fname: &str,
    cfdntl: Box<dyn AbstractConfidentiality>,
) -> DefaultResult<AppSharedState, AppError> {
    let service_basepath = env!("CARGO_MANIFEST_DIR").to_string();
    let fullpath = service_basepath.clone() + EXAMPLE_REL_PATH + cfg_fname;
    let limit = AppCfgHardLimit {
        nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
        num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
        seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
    };
    let cfg = AppConfig {
        api_server: AppConfig::parse_from_file(fullpath, limit).unwrap(),
        basepath: AppBasepathCfg {
            system: service_basepath + "/",
        },
    };
    let logctx = AppLogContext::new(&cfg.basepath, &cfg.api_server.logging);
    AppSharedState::new(cfg, logctx, cfdntl)
}

pub(crate) fn ut_default_shr_state() -> AppSharedState {
    ut_setup_share_state("config_ok.json", Box::new(MockConfidential {})).unwrap()
}

pub(crate) fn ut_log_context() -> Arc<AppLogContext> {
    ut_default_shr_state().log_context().clone()
}

pub(crate) fn ut_inmem_dstore(max_items: u32) -> Arc<Box<dyn AbstInMemoryDStore>> {
    let cfg = AppInMemoryDbCfg {
        alias: "utest".to_string(),
        max_items,
    };
    let obj: Box<dyn AbstInMemoryDStore> = Box::new(AppInMemoryDStore::new(&cfg));
    Arc::new(obj)
}

pub(crate) fn ut_authed_claim(profile: u32, perms: Vec<AppAuthPermissionCode>) -> AppAuthedClaim {
    let now = LocalTime::now().timestamp();
    let perms = perms
        .into_iter()
        .map(|codename| AppAuthClaimPermission {
            app_code: app_meta::RESOURCE_QUOTA_AP_CODE,
            codename,
        })
        .collect();
    AppAuthedClaim {
        profile,
        iat: now - 5,
        exp: now + Duration::minutes(5).num_seconds(),
        aud: vec![app_meta::LABEL.to_string()],
        perms,
        quota: Vec::new(),
    }
}

pub(crate) fn ut_shipping_address() -> ShippingAddressDto {
    ShippingAddressDto {
        recipient: "Zhang Wei".to_string(),
        country: "TW".to_string(),
        region: "Taipei".to_string(),
        city: "Taipei".to_string(),
        street: "No. 7, Section 5, Xinyi Road".to_string(),
        postal_code: "110".to_string(),
    }
}

pub(crate) fn ut_order_req(items: &[(u64, i64)]) -> OrderCreateReqDto {
    let items = items
        .iter()
        .map(|(product_id, quantity)| OrderItemReqDto {
            product_id: *product_id,
            quantity: *quantity,
        })
        .collect();
    OrderCreateReqDto {
        items,
        shipping_address: ut_shipping_address(),
        contact_name: "Zhang Wei".to_string(),
        contact_phone: "+886912345678".to_string(),
        notes: None,
        shipping_fee: None,
        discount_amount: None,
    }
}

// (product ID, artist ID, price, available)
pub(crate) fn ut_price_set(data: &[(u64, u32, &str, bool)]) -> ProductPriceModelSet {
    let time = LocalTime::now().fixed_offset();
    let items = data
        .iter()
        .map(|(product_id, artist_id, price, available)| ProductPriceModel {
            product_id: *product_id,
            artist_id: *artist_id,
            price: price.parse::<Decimal>().unwrap(),
            available: *available,
            last_update: time,
        })
        .collect();
    ProductPriceModelSet { items }
}

#[test]
fn shr_state_missing_keystore() {
    let result = ut_setup_share_state("config_missing_keystore.json", Box::new(MockConfidential {}));
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(
            e.code,
            marketplace_order::error::AppErrorCode::IOerror(std::io::ErrorKind::NotFound)
        );
    }
}

#[test]
fn generate_object_id_format() {
    let ids = (0..20)
        .map(|_| marketplace_order::generate_object_id())
        .collect::<Vec<_>>();
    ids.iter().for_each(|id| {
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    });
    let uniq = ids.iter().collect::<std::collections::HashSet<_>>();
    assert_eq!(uniq.len(), ids.len());
}
