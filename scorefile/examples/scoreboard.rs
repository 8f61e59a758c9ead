//! Write a small score table, read it back, add a score and show that an
//! edited file is rejected.

use scorefile::{Date, Initials, Save, SaveError, SaveFile, Score};

fn print_table(save: &Save) {
    println!("Save from {} ({} scores)", save.date, save.score_count());
    for (i, score) in save.scores().iter().enumerate() {
        println!("  {}: {} {} {}", i, score.value, score.initials, score.date);
    }
}

fn main() -> Result<(), SaveError> {
    env_logger::init();

    let file = SaveFile::default();

    let scores = vec![
        Score::new(Date::new(27, 4, 24), 102030, Initials::new("AMK")?),
        Score::new(Date::new(25, 2, 23), 101010, Initials::new("DBJ")?),
    ];
    let mut save = Save::from_scores(scores)?;
    file.write(&mut save)?;
    println!("Wrote {:?} (checksum {:#010x})\n", file.path(), save.checksum());

    print_table(&file.read()?);

    let updated = file.add_score(Score::new(Date::today(), 99999, Initials::new("NEW")?))?;
    println!();
    print_table(&updated);

    // Edit one score value behind the codec's back
    let mut bytes = std::fs::read(file.path())?;
    bytes[12] ^= 0x10;
    std::fs::write(file.path(), &bytes)?;

    println!();
    match file.read() {
        Ok(_) => println!("Edited file was accepted"),
        Err(e) if e.is_tampered() => println!("Edited file rejected: {}", e),
        Err(e) => return Err(e),
    }

    std::fs::remove_file(file.path())?;
    Ok(())
}
