use crate::{
    model::{DocType, Document, delete_all, doc_type},
    silent_logs,
};
use time::{Date, Month};
use trove::{Connection, Entity, Error, Record, Value};

pub fn lifecycle<C: Connection>(connection: &mut C) {
    delete_all(connection);
    let invoice = doc_type(connection, "Invoice");

    // Insert
    let mut document = Record::<Document>::new(connection).expect("Failed to create a document");
    assert!(document.is_new());
    assert!(!document.locally_modified());
    assert_eq!(document.to_string(), "Document[new]");
    assert_eq!(
        document.save(connection).expect("Failed to save an untouched document"),
        0
    );
    document.type_id = Some(invoice);
    document.title = Some("x".repeat(51));
    document.issued = Some(Date::from_calendar_date(2024, Month::February, 29).unwrap());
    document.rating = Some(4.5);
    let error = document.save(connection).unwrap_err();
    assert!(error.is_validation());
    assert_eq!(
        error.to_string(),
        "Validation failed on save(), Reasons:\n * title cannot be longer than 50"
    );
    assert_eq!(document.invalid_columns(), ["title"]);
    assert!(document.is_new());
    document.title = Some("Quarterly report".into());
    assert_eq!(document.save(connection).expect("Failed to save a document"), 1);
    assert!(document.invalid_messages().is_empty());
    assert!(!document.is_new());
    assert!(!document.locally_modified());
    let id = document.id.expect("The document did not receive its generated key");
    assert_eq!(document.to_string(), format!("Document[{}]", id));

    // Find
    let mut found = Document::find(connection, &[id.into()]).expect("Failed to find the document");
    assert!(!found.is_new());
    assert_eq!(found.id, Some(id));
    assert_eq!(found.type_id, Some(invoice));
    assert_eq!(found.title.as_deref(), Some("Quarterly report"));
    assert_eq!(found.body, None);
    assert_eq!(
        found.issued,
        Some(Date::from_calendar_date(2024, Month::February, 29).unwrap())
    );
    assert_eq!(found.rating, Some(4.5));
    assert_eq!(found.views, None);
    assert_eq!(found.slug, "quarterly-report");
    assert!(!found.locally_modified());
    assert_eq!(
        found,
        Document::find(connection, &found.key_values()).expect("Failed to find the document")
    );
    let missing = Document::find(connection, &[Value::Int64(Some(id + 7))])
        .expect("Failed to look for a missing document");
    assert!(missing.is_new());
    assert_eq!(*missing.entity(), Document::default());
    assert!(matches!(
        Document::find(connection, &[]),
        Err(Error::Usage(..))
    ));

    // Update
    found.title = Some("Yearly report".into());
    assert!(found.locally_modified());
    assert!(found.locally_modified_column("TITLE").unwrap());
    assert!(!found.locally_modified_column("views").unwrap());
    assert!(matches!(
        found.locally_modified_column("author"),
        Err(Error::Configuration(..))
    ));
    assert_eq!(found.save(connection).expect("Failed to update the document"), 1);
    assert!(!found.locally_modified());
    assert_eq!(found.save(connection).expect("Failed to save again"), 0);
    assert!(document.remotely_modified(connection).unwrap());
    assert!(!found.remotely_modified(connection).unwrap());
    document.reload(connection).expect("Failed to reload the document");
    assert_eq!(document.title.as_deref(), Some("Yearly report"));
    assert!(!document.locally_modified());
    assert!(!document.remotely_modified(connection).unwrap());

    // Reset
    document.views = Some(10);
    document.body = Some("Revenue grew".into());
    assert!(document.locally_modified());
    document.reset();
    assert!(!document.locally_modified());
    assert_eq!(document.views, None);
    assert_eq!(document.body, None);

    // Keys of stored rows do not change
    document.id = Some(id + 100);
    silent_logs! {
        assert_eq!(document.save(connection).expect("Failed to save a key change"), 0);
    }
    assert_eq!(document.id, Some(id));
    assert!(!document.locally_modified());

    // Caller checks
    document.views = Some(-1);
    let views = document.views.unwrap_or_default();
    assert!(!document.validate("views", views >= 0, "views cannot be negative").unwrap());
    assert!(matches!(
        document.validate("author", true, "unknown"),
        Err(Error::Configuration(..))
    ));
    let error = document.save(connection).unwrap_err();
    assert!(error.validation().is_some_and(|v| v.cites("views")));
    assert_eq!(document.invalid_messages(), ["views cannot be negative"]);
    document.views = Some(3);
    assert!(document.validate("views", true, "views cannot be negative").unwrap());
    assert_eq!(document.save(connection).expect("Failed to save the views"), 1);
    document.title = None;
    let error = document.save(connection).unwrap_err();
    assert!(error.to_string().contains("title cannot be null"));
    document.clear_validation();
    assert!(document.invalid_columns().is_empty());
    document.reset();

    // Duplicate
    let mut copy = document.duplicate();
    assert!(copy.is_new());
    assert_eq!(copy.save(connection).expect("Failed to save the copy"), 1);
    assert_ne!(copy.id, document.id);
    assert_eq!(copy.title, document.title);
    let mut other = Record::<Document>::new(connection).unwrap();
    other.set(&copy);
    assert_eq!(other, copy);
    assert!(!other.is_new());

    // Delete
    assert_eq!(copy.delete(connection).expect("Failed to delete the copy"), 1);
    assert!(copy.is_new());
    assert_eq!(*copy.entity(), Document::default());
    assert_eq!(copy.delete(connection).expect("Failed to delete twice"), 0);
    other.reload(connection).expect("Failed to reload a deleted document");
    assert!(other.is_new());
    assert_eq!(other.title, None);
    assert!(!document.remotely_modified(connection).unwrap());

    // Clear
    document.clear();
    assert!(document.is_new());
    assert_eq!(*document.entity(), Document::default());
    assert!(!document.locally_modified());
    assert!(Document::find(connection, &[id.into()]).unwrap().title.is_some());

    // Keys assigned by the application
    let mut kind = Record::<DocType>::with_keys(connection, &[(invoice + 50).into()])
        .expect("Failed to create a DocType with keys");
    assert!(kind.is_new());
    assert_eq!(kind.id, Some(invoice + 50));
    kind.name = Some("Memo".into());
    assert!(matches!(
        Record::<DocType>::with_keys(connection, &[1i64.into(), 2i64.into()]),
        Err(Error::Usage(..))
    ));
}
