use serde::Serialize;

use crate::store::Store;

use super::init_store;

#[derive(Serialize)]
struct ServerInfo {
    users: i32,
    students: i32,
    lessons: i32,
    subjects: i32,
    tokens: i32,
}

#[derive(Serialize)]
struct UserOutput {
    id: String,
    email: String,
    created_at: String,
    students: i32,
    lessons: i32,
}

#[derive(Serialize)]
struct TokenOutput {
    id: String,
    lookup: String,
    user_id: Option<String>,
    email: Option<String>,
    is_admin: bool,
    created_at: String,
    expires_at: Option<String>,
    last_used_at: Option<String>,
}

#[derive(Serialize)]
struct DetailedServerInfo {
    users: Vec<UserOutput>,
    tokens: Vec<TokenOutput>,
    students: i32,
    lessons: i32,
    subjects: i32,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let users = store.list_users("", 10000)?;
    let tokens = store.list_tokens("", 10000)?;

    let mut student_count = 0;
    let mut lesson_count = 0;
    let mut subject_count = 0;
    let mut user_outputs = Vec::with_capacity(users.len());

    for user in &users {
        let students = store.list_students(&user.id)?.len() as i32;
        let lessons = store.list_recent_lessons(&user.id, 10000)?.len() as i32;
        let subjects = store.list_subjects(&user.id)?.len() as i32;

        student_count += students;
        lesson_count += lessons;
        subject_count += subjects;

        user_outputs.push(UserOutput {
            id: user.id.clone(),
            email: user.email.clone(),
            created_at: user.created_at.to_rfc3339(),
            students,
            lessons,
        });
    }

    if json {
        let mut token_outputs = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let email = match &token.user_id {
                Some(user_id) => store.get_user(user_id)?.map(|u| u.email),
                None => None,
            };
            token_outputs.push(TokenOutput {
                id: token.id.clone(),
                lookup: token.token_lookup.clone(),
                user_id: token.user_id.clone(),
                email,
                is_admin: token.is_admin,
                created_at: token.created_at.to_rfc3339(),
                expires_at: token.expires_at.map(|dt| dt.to_rfc3339()),
                last_used_at: token.last_used_at.map(|dt| dt.to_rfc3339()),
            });
        }

        let info = DetailedServerInfo {
            users: user_outputs,
            tokens: token_outputs,
            students: student_count,
            lessons: lesson_count,
            subjects: subject_count,
        };

        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let info = ServerInfo {
            users: users.len() as i32,
            students: student_count,
            lessons: lesson_count,
            subjects: subject_count,
            tokens: tokens.len() as i32,
        };

        println!();
        println!("Tutorlog Server Status");
        println!("{}", "─".repeat(22));
        println!("Users:     {}", info.users);
        println!("Students:  {}", info.students);
        println!("Lessons:   {}", info.lessons);
        println!("Subjects:  {}", info.subjects);
        println!("Tokens:    {}", info.tokens);
        println!();
    }

    Ok(())
}
