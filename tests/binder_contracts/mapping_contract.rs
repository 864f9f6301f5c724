//! Contract tests for the column mapping generator.
//!
//! - Column ordinals of an entity map are contiguous from 0
//! - A primitive source never synthesizes the reference discriminator

use proptest::prelude::*;
use unionsql::catalog::{EntityDefinition, PropertyDefinition};
use unionsql::mapping::{create_entity_map, create_mapping_rules, ColumnSource};
use unionsql::types::{
    ColumnPurpose, UnionFlags, UnionTag, UnionType, DISCRIMINATOR_ENTITY, DISCRIMINATOR_UNDEFINED,
};

const PRIMITIVE_TAGS: [UnionTag; 8] = [
    UnionTag::Boolean,
    UnionTag::Numeric,
    UnionTag::DateTime,
    UnionTag::String,
    UnionTag::Binary,
    UnionTag::Uuid,
    UnionTag::Version,
    UnionTag::Integer,
];

fn property_type() -> impl Strategy<Value = UnionType> {
    prop_oneof![
        (1u16..u16::MAX).prop_map(|bits| UnionType::from_flags(UnionFlags::from_bits_truncate(bits))),
        (1..500i32).prop_map(UnionType::entity),
        proptest::sample::select(PRIMITIVE_TAGS.to_vec()).prop_map(UnionType::from),
    ]
    .prop_filter("a property admits at least one kind", |t| !t.is_undefined())
}

fn definition(name: &str, types: &[UnionType]) -> EntityDefinition {
    let properties = types
        .iter()
        .enumerate()
        .map(|(i, t)| PropertyDefinition::new(format!("П{i}"), format!("_Fld{i}"), *t))
        .collect();
    EntityDefinition::new(1, name, "_Reference1", properties).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: ordinals are exactly 0..N across all properties
    #[test]
    fn test_ordinals_are_contiguous(types in proptest::collection::vec(property_type(), 1..12)) {
        let map = create_entity_map(&definition("Справочник.Тест", &types));
        let ordinals: Vec<usize> = map.columns().map(|c| c.ordinal).collect();
        let expected: Vec<usize> = (0..map.column_count()).collect();
        prop_assert_eq!(ordinals, expected);
        prop_assert_eq!(map.properties().len(), types.len());
    }

    /// Property: a single primitive source stores its own discriminator or
    /// the undefined one, never the reference one
    #[test]
    fn test_primitive_source_discriminator(
        source_tag in proptest::sample::select(PRIMITIVE_TAGS.to_vec()),
        target_tags in proptest::sample::subsequence(PRIMITIVE_TAGS.to_vec(), 0..8),
    ) {
        let mut target_type = UnionType::from(UnionTag::Entity);
        for tag in &target_tags {
            target_type.add(*tag);
        }
        let target = create_entity_map(&definition("Цель", &[target_type]));
        let source = create_entity_map(&definition("Источник", &[UnionType::from(source_tag)]));

        let rules = create_mapping_rules(&target, &source, None).unwrap();
        let tag_rule = rules[0]
            .columns
            .iter()
            .find(|c| c.target.purpose == ColumnPurpose::Tag)
            .unwrap();

        let expected = if target_tags.contains(&source_tag) {
            source_tag.discriminator().unwrap_or(DISCRIMINATOR_UNDEFINED)
        } else {
            DISCRIMINATOR_UNDEFINED
        };
        prop_assert_eq!(&tag_rule.source, &ColumnSource::Discriminator(expected));
        prop_assert_ne!(&tag_rule.source, &ColumnSource::Discriminator(DISCRIMINATOR_ENTITY));
    }
}

#[test]
fn test_reference_source_into_union_target() {
    let target_type = UnionType::of(&[UnionTag::Entity, UnionTag::String]);
    let target = create_entity_map(&definition("Цель", &[target_type]));
    let source = create_entity_map(&definition("Источник", &[UnionType::entity(42)]));

    let rules = create_mapping_rules(&target, &source, None).unwrap();
    let literals: Vec<Option<String>> = rules[0].columns.iter().map(|c| c.source.literal()).collect();
    assert_eq!(
        literals,
        vec![
            Some("0x08".to_string()),
            Some("N''".to_string()),
            Some("0x0000002A".to_string()),
            None,
        ]
    );
}

#[test]
fn test_no_source_gets_defaults() {
    let target_type = UnionType::of(&[UnionTag::Entity, UnionTag::Numeric]);
    let target = create_entity_map(&definition("Цель", &[target_type]));
    let source = create_entity_map(&EntityDefinition::new(
        2,
        "Источник",
        "_Reference2",
        vec![PropertyDefinition::new("Другое", "_Fld1", UnionTag::String.into())],
    )
    .unwrap());

    let rules = create_mapping_rules(&target, &source, None).unwrap();
    assert!(rules[0].source.is_none());
    let literals: Vec<String> = rules[0]
        .columns
        .iter()
        .filter_map(|c| c.source.literal())
        .collect();
    assert_eq!(literals, vec!["0x01", "0", "0x00000000", "0x00000000000000000000000000000000"]);
}
