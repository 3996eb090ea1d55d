use sip_schemas::Beverage;

/// Combine local and external search results.
///
/// Local results come first, then external, each in source order. With no
/// local results the external list is returned as is. No de-duplication: a
/// local "Mojito" and the catalog's "Mojito" both appear.
pub fn merge_results(local: Vec<Beverage>, external: Vec<Beverage>) -> Vec<Beverage> {
    if local.is_empty() {
        return external;
    }
    let mut out = local;
    out.extend(external);
    out
}
