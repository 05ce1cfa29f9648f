//! Attribute-anchored layout.
//!
//! Title comes from the heading, price from the second span of the
//! `CARD_PRICE*` element, and lot/distance/unit from the first block whose
//! text starts with "Lot #" (lot line, then "distance unit").

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::normalize::{normalize_amount, normalize_bounded_distance};
use super::{parse_lot_line, ExtractError, LOT_PREFIX};
use crate::models::{ListingDetails, ListingRecord};
use crate::render::container::container_element;
use crate::render::ListingContainer;
use crate::utils::rendered_text;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static PRICE_BOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[id^='CARD_PRICE']").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static BLOCK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());

pub(super) fn extract(container: &ListingContainer) -> Result<ListingRecord, ExtractError> {
    let fragment = Html::parse_fragment(&container.html);
    let root = container_element(&fragment).ok_or(ExtractError::ElementNotFound("container"))?;

    let title = descendants(root, &TITLE)
        .next()
        .map(rendered_text)
        .ok_or(ExtractError::ElementNotFound("h3"))?;

    let price_text = descendants(root, &PRICE_BOX)
        .next()
        .and_then(|price_box| price_box.select(&SPAN).nth(1))
        .map(rendered_text)
        .ok_or(ExtractError::ElementNotFound("[id^='CARD_PRICE'] span (2nd)"))?;

    let (lot, distance_text, unit) = find_lot_block(root)?;

    let price = normalize_amount(&price_text).map_err(ExtractError::field("price"))?;
    let distance =
        normalize_bounded_distance(&distance_text).map_err(ExtractError::field("distance"))?;

    Ok(ListingRecord {
        lot,
        title,
        price,
        details: ListingDetails::Attribute { distance, unit },
    })
}

/// Matching descendants of `root`, excluding `root` itself.
fn descendants<'a>(
    root: ElementRef<'a>,
    selector: &'a Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let root_id = root.id();
    root.select(selector).filter(move |el| el.id() != root_id)
}

/// Scan blocks in DOM order for the first whose text starts with "Lot #".
fn find_lot_block(root: ElementRef<'_>) -> Result<(String, String, String), ExtractError> {
    let text = descendants(root, &BLOCK)
        .map(rendered_text)
        .find(|text| text.starts_with(LOT_PREFIX))
        .ok_or(ExtractError::LotNumberNotFound)?;

    let mut lines = text.lines();
    let lot = parse_lot_line(lines.next().unwrap_or_default())?;

    let mileage = lines.next().ok_or_else(|| {
        ExtractError::UnexpectedLayout(format!("lot block has no distance line: {:?}", text))
    })?;
    let mut parts = mileage.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(distance), Some(unit)) => Ok((lot, distance.to_string(), unit.to_string())),
        _ => Err(ExtractError::UnexpectedLayout(format!(
            "expected \"<distance> <unit>\", got {:?}",
            mileage
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::NormalizeError;
    use crate::models::Price;

    fn card(title: &str, price: &str, lot_block: &str) -> ListingContainer {
        ListingContainer::from_html(
            1,
            format!(
                r#"<div class="list-card-container">
                    <a href="/motors/1"><img src="car.jpg"></a>
                    <h3> {title} </h3>
                    <div id="CARD_PRICE_1"><span>AED</span> <span>{price}</span></div>
                    <div class="details">{lot_block}</div>
                </div>"#
            ),
        )
    }

    #[test]
    fn test_extract_accord() {
        let container = card(
            "2019 Honda Accord",
            "45,000",
            "<div>Lot #12345</div><div>1,200 km</div>",
        );
        let record = extract(&container).unwrap();

        assert_eq!(record.lot, "12345");
        assert_eq!(record.title, "2019 Honda Accord");
        assert_eq!(record.price, Price::from_cents(4_500_000));
        assert_eq!(
            record.details,
            ListingDetails::Attribute {
                distance: 1200,
                unit: "km".to_string()
            }
        );
    }

    #[test]
    fn test_missing_lot_block() {
        let container = card("2019 Honda Accord", "45,000", "<div>1,200 km</div>");
        assert_eq!(extract(&container), Err(ExtractError::LotNumberNotFound));
    }

    #[test]
    fn test_missing_heading() {
        let container = ListingContainer::from_html(
            1,
            r#"<div><div id="CARD_PRICE_2"><span>AED</span><span>1</span></div></div>"#,
        );
        assert_eq!(extract(&container), Err(ExtractError::ElementNotFound("h3")));
    }

    #[test]
    fn test_missing_price_span() {
        let container = ListingContainer::from_html(
            1,
            r#"<div><h3>Civic</h3><div id="CARD_PRICE_3"><span>AED</span></div>
               <div><div>Lot #1</div><div>10 km</div></div></div>"#,
        );
        assert!(matches!(
            extract(&container),
            Err(ExtractError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_distance_out_of_range() {
        let container = card(
            "2016 Honda Pilot",
            "30,500",
            "<div>Lot #777</div><div>70,000 km</div>",
        );
        assert_eq!(
            extract(&container),
            Err(ExtractError::Field {
                field: "distance",
                source: NormalizeError::OutOfRange("70,000".to_string()),
            })
        );
    }

    #[test]
    fn test_lot_block_without_unit() {
        let container = card("2016 Honda Pilot", "30,500", "<div>Lot #777</div><div>70</div>");
        assert!(matches!(
            extract(&container),
            Err(ExtractError::UnexpectedLayout(_))
        ));
    }
}
