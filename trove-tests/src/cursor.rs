use crate::model::{Document, delete_all, doc_type};
use trove::{Connection, Entity, Error, Record, update};

pub fn cursor<C: Connection>(connection: &mut C) {
    delete_all(connection);
    let letter = doc_type(connection, "Letter");
    for (title, views) in [("Dear Anna", 5), ("Dear Bruno", 0), ("Dear Carla", 12)] {
        let mut document = Record::<Document>::new(connection).unwrap();
        *document = Document::titled(Some(letter), title);
        document.views = Some(views);
        document.save(connection).expect("Failed to save a letter");
    }

    // Single pass
    let mut results = Document::find_all(connection).unwrap();
    assert_eq!(results.size().unwrap(), 3);
    assert_eq!(results.iter().unwrap().count(), 3);
    assert!(matches!(results.iter(), Err(Error::Usage(..))));
    assert!(matches!(results.list(), Err(Error::Usage(..))));
    let mut results = Document::find_all(connection).unwrap();
    let first = results.list().unwrap().len();
    let again = results.list().unwrap().len();
    assert_eq!((first, again), (3, 3));
    assert_eq!(results.size().unwrap(), 3);
    assert_eq!(results.total().unwrap(), 3);
    assert_eq!(results.update_count(), Some(0));

    // First and last
    let first = Document::find_first(connection, "views > ?", &[1i32.into()]).unwrap();
    assert_eq!(first.title.as_deref(), Some("Dear Anna"));
    let last = Document::find_last(connection, "", &[]).unwrap();
    assert_eq!(last.title.as_deref(), Some("Dear Carla"));
    let none = Document::find_first(connection, "views > ?", &[100i32.into()]).unwrap();
    assert!(none.is_new());
    let bruno = Document::sql_first(
        connection,
        "SELECT title, id, views AS VIEWS, 'ignored' AS extra FROM Documents WHERE views = 0",
        &[],
    )
    .unwrap();
    assert_eq!(bruno.title.as_deref(), Some("Dear Bruno"));
    assert_eq!(bruno.views, Some(0));
    assert_eq!(bruno.type_id, None);

    // By example, null fields are not compared
    let example = Document {
        type_id: Some(letter),
        views: Some(12),
        ..Default::default()
    };
    let mut matching = Document::find_by_example(connection, &example).unwrap();
    let list = matching.list().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title.as_deref(), Some("Dear Carla"));
    let example = Document {
        title: Some("Dear Bruno".into()),
        ..Default::default()
    };
    let mut matching = Document::find_by_example(connection, &example)
        .expect("Failed to find by a title only example");
    let list = matching.list().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].views, Some(0));

    // Statements without records
    assert!(matches!(
        Document::sql(connection, "UPDATE Documents SET views = 1", &[]),
        Err(Error::Usage(..))
    ));
    assert_eq!(
        update(
            connection,
            "UPDATE Documents SET views = views + ? WHERE typeId = ?",
            &[10i32.into(), letter.into()],
        )
        .expect("Failed to update the letters"),
        3
    );
    let carla = Document::find_last(connection, "", &[]).unwrap();
    assert_eq!(carla.views, Some(22));
    assert_eq!(
        Document::delete_all(connection, "views < ?", &[20i32.into()]).unwrap(),
        2
    );
    assert_eq!(Document::find_all(connection).unwrap().size().unwrap(), 1);
}

#[cfg(not(feature = "disable-multiple-statements"))]
pub fn scripts<C: Connection>(connection: &mut C) {
    use indoc::indoc;

    delete_all(connection);
    let notice = doc_type(connection, "Notice");
    for title in ["Fire drill", "Parking"] {
        let mut document = Record::<Document>::new(connection).unwrap();
        *document = Document::titled(Some(notice), title);
        document.views = Some(1);
        document.save(connection).unwrap();
    }
    let mut results = Document::exec(
        connection,
        indoc! {"
            UPDATE Documents SET views = views * 10 WHERE typeId = ?;
            SELECT * FROM Documents WHERE typeId = ? ORDER BY title;
        "},
        &[notice.into(), notice.into()],
    )
    .unwrap();
    assert_eq!(results.update_count(), None);
    let records = results
        .iter()
        .unwrap()
        .collect::<trove::Result<Vec<_>>>()
        .expect("Failed to run the script");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title.as_deref(), Some("Fire drill"));
    assert!(records.iter().all(|v| v.views == Some(10)));
    assert_eq!(results.update_count(), Some(2));
    assert_eq!(
        update(
            connection,
            "DELETE FROM Documents WHERE title = ?; DELETE FROM Documents WHERE title = ?",
            &["Fire drill".into(), "Parking".into()],
        )
        .unwrap(),
        2
    );
}

#[cfg(not(feature = "disable-generated-keys"))]
pub fn generated_keys<C: Connection>(connection: &mut C) {
    delete_all(connection);
    let circular = doc_type(connection, "Circular");
    let mut results = Document::sql(
        connection,
        "INSERT INTO Documents (typeId, title, views) VALUES (?, ?, ?)",
        &[circular.into(), "Holidays".into(), 3i32.into()],
    )
    .unwrap();
    let inserted = results
        .iter()
        .unwrap()
        .collect::<trove::Result<Vec<_>>>()
        .expect("Failed to insert through the cursor");
    assert_eq!(inserted.len(), 1);
    let record = &inserted[0];
    assert!(!record.is_new());
    assert!(record.id.is_some());
    assert_eq!(record.title.as_deref(), Some("Holidays"));
    assert_eq!(record.views, Some(3));
    assert_eq!(record.slug, "holidays");
    assert_eq!(results.update_count(), Some(1));
    let stored = Document::find(connection, &record.key_values()).unwrap();
    assert_eq!(&stored, record);
}
