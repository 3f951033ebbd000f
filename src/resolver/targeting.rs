//! Ad-server targeting and master video tag construction.
//!
//! Targeting follows the send-all-bids layout: the winning bid (highest CPM) fills
//! the bare `hb_*` keys, and every bid additionally contributes `hb_*_<bidder>` keys.
//!
//! ```text
//! bids ──► [hb_bidder, hb_adid, hb_pb, hb_size, (hb_deal)]        winner
//!      └─► [hb_bidder_<b>, hb_adid_<b>, hb_pb_<b>, hb_size_<b>]   per bid
//!                │
//!                ▼
//!   cust_params = form-encode(form-encode(k)=form-encode(v)&...)
//! ```

use url::{form_urlencoded, Url};

use crate::error::ResolutionError;
use crate::external::Bid;
use crate::resolver::AdUnit;

/// Ad-server base of the master video tag.
pub const TAG_BASE: &str = "https://pubads.g.doubleclick.net/gampad/ads";

/// Price buckets are capped here (dense granularity above is not traded).
const PRICE_CAP: f64 = 20.0;

/// Ordered key/value targeting.
pub type Targeting = Vec<(String, String)>;

/// Price bucket with 0.10 granularity, capped at 20.00.
pub fn price_bucket(cpm: f64) -> String {
    if !cpm.is_finite() || cpm <= 0.0 {
        return "0.00".to_string();
    }
    let capped = cpm.min(PRICE_CAP);
    let bucket = (capped * 10.0).floor() / 10.0;
    format!("{bucket:.2}")
}

/// Computes targeting for `bids`. No bids yields empty targeting.
pub fn compute(bids: &[Bid]) -> Result<Targeting, ResolutionError> {
    let mut out = Targeting::new();
    let winner = bids
        .iter()
        .filter(|b| b.cpm.is_finite())
        .max_by(|a, b| a.cpm.total_cmp(&b.cpm));

    if let Some(w) = winner {
        push(&mut out, "hb_bidder", &w.bidder)?;
        push(&mut out, "hb_adid", &w.ad_id)?;
        push(&mut out, "hb_pb", &price_bucket(w.cpm))?;
        push(&mut out, "hb_size", &w.size())?;
        if let Some(deal) = &w.deal_id {
            push(&mut out, "hb_deal", deal)?;
        }
    }

    for bid in bids {
        if bid.bidder.trim().is_empty() {
            return Err(ResolutionError::MalformedTargeting(
                "bid without bidder code".to_string(),
            ));
        }
        let b = &bid.bidder;
        push(&mut out, &format!("hb_bidder_{b}"), b)?;
        push(&mut out, &format!("hb_adid_{b}"), &bid.ad_id)?;
        push(&mut out, &format!("hb_pb_{b}"), &price_bucket(bid.cpm))?;
        push(&mut out, &format!("hb_size_{b}"), &bid.size())?;
    }
    Ok(out)
}

fn push(out: &mut Targeting, key: &str, value: &str) -> Result<(), ResolutionError> {
    if key.is_empty() {
        return Err(ResolutionError::MalformedTargeting("empty key".to_string()));
    }
    out.push((key.to_string(), value.to_string()));
    Ok(())
}

/// Serializes targeting into the `cust_params` value (each key and value form-encoded).
pub fn cust_params(targeting: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in targeting {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Builds the master video tag for `unit`.
pub fn build_tag_url(
    unit: &AdUnit,
    targeting: &[(String, String)],
    correlator: u64,
) -> Result<String, ResolutionError> {
    let (w, h) = unit
        .sizes
        .first()
        .copied()
        .ok_or_else(|| ResolutionError::MissingSizes(unit.code.clone()))?;

    let mut url = Url::parse(TAG_BASE)
        .map_err(|e| ResolutionError::MalformedTargeting(format!("tag base: {e}")))?;
    url.query_pairs_mut()
        .append_pair("env", "vp")
        .append_pair("gdfp_req", "1")
        .append_pair("output", "vast")
        .append_pair("unviewed_position_start", "1")
        .append_pair("iu", &unit.path)
        .append_pair("sz", &format!("{w}x{h}"))
        .append_pair("description_url", &unit.description_url)
        .append_pair("correlator", &correlator.to_string())
        .append_pair("cust_params", &cust_params(targeting));
    Ok(url.into())
}
