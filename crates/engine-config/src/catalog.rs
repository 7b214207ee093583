use crate::error::ConfigError;
use model::sync::{catalog::Catalog, table::TableSpec};

const USER_FILTER: &str = r#"
    "id" IN (
        SELECT DISTINCT "userId" FROM "UserHangoutGroup" WHERE "userId" IS NOT NULL
        UNION
        SELECT DISTINCT "userId" FROM "UserHangoutGroupAttendance" WHERE "userId" IS NOT NULL
    )
"#;

const ORDER_FILTER: &str = r#"
    "id" IN (
        SELECT DISTINCT "orderId" FROM "UserHangoutGroup" WHERE "orderId" IS NOT NULL
    )
"#;

/// The synced tables in dependency order. Referenced tables come first.
pub fn default_catalog() -> Catalog {
    let tables = vec![
        TableSpec::builder("User")
            .columns(&[
                "id",
                "createdAt",
                "updatedAt",
                "email",
                "lastLogin",
                "lastActive",
                "deletedAt",
            ])
            .soft_delete("deletedAt")
            .source_filter(USER_FILTER)
            .build(),
        TableSpec::builder("Image")
            .watermark("createdAt")
            .columns(&[
                "id",
                "createdAt",
                "url",
                "height",
                "provider",
                "publicId",
                "width",
            ])
            .build(),
        TableSpec::builder("Order")
            .columns(&[
                "id",
                "createdAt",
                "updatedAt",
                "userId",
                "amount",
                "status",
                "publicId",
                "type",
                "expiredAt",
                "uniqueCode",
                "adminFee",
            ])
            .source_filter(ORDER_FILTER)
            .build(),
        TableSpec::builder("Hangout")
            .columns(&[
                "id",
                "createdAt",
                "updatedAt",
                "name",
                "description",
                "type",
                "price",
                "circleProfileId",
                "visibility",
                "hangoutProgramId",
                "pictureId",
            ])
            .fk_columns(&["circleProfileId", "hangoutProgramId", "pictureId"])
            .build(),
        TableSpec::builder("HangoutEpisode")
            .columns(&[
                "id",
                "createdAt",
                "updatedAt",
                "name",
                "description",
                "hangoutId",
                "order",
            ])
            .build(),
        TableSpec::builder("HangoutGroup")
            .columns(&[
                "id",
                "createdAt",
                "updatedAt",
                "name",
                "description",
                "status",
                "day",
                "time",
                "hangoutId",
                "imageId",
                "endDate",
                "startDate",
                "city",
                "province",
            ])
            .fk_columns(&["imageId"])
            .build(),
        TableSpec::builder("UserHangoutGroup")
            .columns(&[
                "id",
                "createdAt",
                "updatedAt",
                "joinedAt",
                "status",
                "hangoutGroupRole",
                "hangoutGroupId",
                "userId",
                "publicId",
                "userEmail",
                "orderId",
            ])
            .fk_columns(&["orderId"])
            .build(),
        TableSpec::builder("UserHangoutGroupAttendance")
            .watermark("attendedAt")
            .columns(&[
                "id",
                "attendedAt",
                "hangoutEpisodeId",
                "hangoutGroupId",
                "userId",
            ])
            .build(),
    ];

    Catalog::new(tables)
        .with_foreign_key("circleProfileId", "CircleProfile")
        .with_foreign_key("hangoutProgramId", "HangoutProgram")
        .with_foreign_key("pictureId", "Image")
        .with_foreign_key("imageId", "Image")
        .with_foreign_key("orderId", "Order")
}

/// [`default_catalog`], checked for ordering and column consistency.
pub fn load_catalog() -> Result<Catalog, ConfigError> {
    let catalog = default_catalog();
    catalog.validate()?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = load_catalog().unwrap();
        let names: Vec<_> = catalog.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "User",
                "Image",
                "Order",
                "Hangout",
                "HangoutEpisode",
                "HangoutGroup",
                "UserHangoutGroup",
                "UserHangoutGroupAttendance",
            ]
        );
    }

    #[test]
    fn test_only_user_propagates_soft_deletes() {
        let catalog = default_catalog();
        let soft: Vec<_> = catalog
            .tables()
            .iter()
            .filter(|t| t.has_soft_delete())
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(soft, vec!["User"]);
    }

    #[test]
    fn test_filters_are_trimmed_and_fk_map_resolves() {
        let catalog = default_catalog();
        let user = catalog.table("User").unwrap();
        let filter = user.source_filter.as_deref().unwrap();
        assert!(filter.starts_with(r#""id" IN ("#));
        assert!(filter.ends_with(')'));

        assert_eq!(catalog.referenced_table("imageId"), Some("Image"));
        assert_eq!(catalog.referenced_table("hangoutId"), None);
        assert_eq!(
            catalog.table("UserHangoutGroupAttendance").unwrap().watermark_column,
            "attendedAt"
        );
    }
}
