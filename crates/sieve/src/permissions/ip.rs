use std::net::IpAddr;

/// Returns `true` when `ip` falls within one of `ranges`. Each range is an
/// address or a CIDR block. An empty list places no restriction; an
/// unknown caller address never matches a non-empty one.
pub(crate) fn allows(ranges: &[String], ip: Option<IpAddr>) -> bool {
    if ranges.is_empty() {
        return true;
    }

    let Some(ip) = ip else {
        return false;
    };

    ranges.iter().any(|range| matches(range.trim(), ip.to_canonical()))
}

fn matches(range: &str, ip: IpAddr) -> bool {
    let Some((network, prefix)) = range.split_once('/') else {
        return range
            .parse::<IpAddr>()
            .map_or(false, |addr| addr.to_canonical() == ip);
    };

    let (Ok(network), Ok(prefix)) = (network.parse::<IpAddr>(), prefix.parse::<u32>()) else {
        return false;
    };

    match (network, ip) {
        (IpAddr::V4(network), IpAddr::V4(ip)) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            u32::from(network) & mask == u32::from(ip) & mask
        }
        (IpAddr::V6(network), IpAddr::V6(ip)) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
            u128::from(network) & mask == u128::from(ip) & mask
        }
        _ => false,
    }
}
