use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, error};

use super::{is_valid_points, Catalog, Language, QuizError, QuizId, UserId};

/// The most quizzes a single session can queue.
pub const MAX_QUEUED_QUIZZES: usize = 2;

/// Progress of one user through a queue of quizzes.
///
/// The queue is never empty; its front is the quiz being answered and
/// `index` points into that quiz's flattened question list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    lang: Language,
    queue: VecDeque<QuizId>,
    index: usize,
    answers: HashMap<QuizId, Vec<u32>>,
}

impl Session {
    pub fn lang(&self) -> Language {
        self.lang
    }

    pub fn current(&self) -> &QuizId {
        &self.queue[0]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn queue(&self) -> impl Iterator<Item = &QuizId> {
        self.queue.iter()
    }

    /// Points recorded for `quiz` in answer order, `None` until its first answer.
    pub fn answers_for(&self, quiz: &QuizId) -> Option<&[u32]> {
        self.answers.get(quiz).map(Vec::as_slice)
    }

    /// Raw totals of every quiz answered so far.
    pub fn totals(&self) -> HashMap<QuizId, u32> {
        self.answers
            .iter()
            .map(|(quiz, points)| (quiz.clone(), points.iter().sum()))
            .collect()
    }
}

/// Where live sessions are kept, keyed by user.
pub trait SessionStore: Send + Sync {
    fn get(&self, user: UserId) -> Option<Session>;
    fn set(&self, user: UserId, session: Session);
    fn delete(&self, user: UserId);

    /// Replaces the user's session with what `apply` returns (`None` deletes
    /// it). No other access to the same user may interleave with the call.
    fn update(&self, user: UserId, apply: &mut dyn FnMut(Option<Session>) -> Option<Session>);
}

struct StoredSession {
    session: Session,
    touched: Instant,
}

/// Process-local session store. Nothing survives a restart.
///
/// With a TTL, sessions untouched for longer than the TTL are treated as
/// absent and dropped by [`MemorySessionStore::evict_expired`].
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<UserId, StoredSession>>,
    ttl: Option<Duration>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::default(),
            ttl: Some(ttl),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired sessions, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    fn evict_expired_at(&self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, stored| !is_expired(stored, ttl, now));
        before - sessions.len()
    }

    fn get_at(&self, user: UserId, now: Instant) -> Option<Session> {
        let mut sessions = self.lock();
        let stored = sessions.get(&user)?;
        if self.ttl.is_some_and(|ttl| is_expired(stored, ttl, now)) {
            sessions.remove(&user);
            return None;
        }
        Some(stored.session.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, StoredSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_expired(stored: &StoredSession, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(stored.touched) > ttl
}

impl SessionStore for MemorySessionStore {
    fn get(&self, user: UserId) -> Option<Session> {
        self.get_at(user, Instant::now())
    }

    fn set(&self, user: UserId, session: Session) {
        self.lock().insert(
            user,
            StoredSession {
                session,
                touched: Instant::now(),
            },
        );
    }

    fn delete(&self, user: UserId) {
        self.lock().remove(&user);
    }

    fn update(&self, user: UserId, apply: &mut dyn FnMut(Option<Session>) -> Option<Session>) {
        let now = Instant::now();
        let mut sessions = self.lock();
        let current = sessions
            .remove(&user)
            .filter(|stored| !self.ttl.is_some_and(|ttl| is_expired(stored, ttl, now)))
            .map(|stored| stored.session);
        if let Some(session) = apply(current) {
            sessions.insert(
                user,
                StoredSession {
                    session,
                    touched: now,
                },
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    pub quiz: QuizId,
    pub title: String,
    pub section: String,
    pub prompt: String,
    /// 1-based position within the current quiz.
    pub number: usize,
    pub total: usize,
}

/// Outcome of recording an answer for the last question of a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizFinished {
    pub quiz: QuizId,
    pub lang: Language,
    pub answers: Vec<u32>,
    pub score: u32,
    /// The quiz the session moved on to, if any.
    pub next: Option<QuizId>,
    /// Totals of every quiz answered in this session, this one included.
    pub totals: HashMap<QuizId, u32>,
}

impl QuizFinished {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn session_complete(&self) -> bool {
        self.next.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceResult {
    NextQuestion,
    QuizFinished(QuizFinished),
}

/// The quiz session state machine.
pub struct QuizEngine {
    catalog: Arc<Catalog>,
    store: Arc<dyn SessionStore>,
}

impl QuizEngine {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn SessionStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Starts a session for `user`, replacing any session already in progress.
    pub fn start_session(
        &self,
        user: UserId,
        lang: Language,
        quizzes: &[QuizId],
    ) -> Result<Session, QuizError> {
        if quizzes.is_empty() {
            return Err(QuizError::EmptySelection);
        }
        if quizzes.len() > MAX_QUEUED_QUIZZES {
            return Err(QuizError::SelectionTooLong(quizzes.len()));
        }
        for quiz in quizzes {
            self.catalog.get_quiz(lang, quiz)?;
        }

        let session = Session {
            lang,
            queue: quizzes.iter().cloned().collect(),
            index: 0,
            answers: HashMap::new(),
        };
        self.store.set(user, session.clone());
        debug!("User {user} started {quizzes:?} in {lang}");
        Ok(session)
    }

    pub fn session(&self, user: UserId) -> Result<Session, QuizError> {
        self.store.get(user).ok_or(QuizError::NoActiveSession(user))
    }

    pub fn current_question(&self, user: UserId) -> Result<CurrentQuestion, QuizError> {
        self.question_for(&self.session(user)?)
    }

    pub fn question_for(&self, session: &Session) -> Result<CurrentQuestion, QuizError> {
        let quiz = session.current();
        let definition = self.catalog.get_quiz(session.lang, quiz)?;
        let flat = self.catalog.flatten(session.lang, quiz)?;
        let question = flat.get(session.index).ok_or_else(|| {
            let err = QuizError::IndexOutOfRange {
                quiz: quiz.clone(),
                index: session.index,
                total: flat.len(),
            };
            error!("{err}");
            err
        })?;

        Ok(CurrentQuestion {
            quiz: quiz.clone(),
            title: definition.title.clone(),
            section: question.section.clone(),
            prompt: question.prompt.clone(),
            number: session.index + 1,
            total: flat.len(),
        })
    }

    /// Records `points` for the current question and moves the session on.
    ///
    /// The whole transition runs inside one [`SessionStore::update`], so
    /// concurrent answers of the same user are applied one after another.
    /// Finishing the last queued quiz removes the session; the returned
    /// [`QuizFinished`] carries the final tallies.
    pub fn record_answer(&self, user: UserId, points: u32) -> Result<AdvanceResult, QuizError> {
        let mut outcome = Err(QuizError::NoActiveSession(user));
        self.store.update(user, &mut |stored: Option<Session>| {
            let session = stored?;
            match self.advance(user, session.clone(), points) {
                Ok((next, result)) => {
                    outcome = Ok(result);
                    next
                }
                Err(err) => {
                    outcome = Err(err);
                    Some(session)
                }
            }
        });
        outcome
    }

    /// Computes the session that follows an answer; `None` means it is complete.
    fn advance(
        &self,
        user: UserId,
        mut session: Session,
        points: u32,
    ) -> Result<(Option<Session>, AdvanceResult), QuizError> {
        if !is_valid_points(points) {
            return Err(QuizError::InvalidPoints(points));
        }

        let current = session.current().clone();
        let total = self.catalog.total_questions(session.lang, &current)?;
        if session.index >= total {
            let err = QuizError::IndexOutOfRange {
                quiz: current,
                index: session.index,
                total,
            };
            error!("{err}");
            return Err(err);
        }

        session
            .answers
            .entry(current.clone())
            .or_default()
            .push(points);

        if session.index + 1 < total {
            session.index += 1;
            debug!("User {user} answered {points}, moving to {current} #{}", session.index + 1);
            return Ok((Some(session), AdvanceResult::NextQuestion));
        }

        let answers = session.answers[&current].clone();
        let score: u32 = answers.iter().sum();
        let totals = session.totals();
        let lang = session.lang;
        debug!("User {user} finished {current} with {score}");

        let (remaining, next) = if session.queue.len() > 1 {
            session.queue.pop_front();
            session.index = 0;
            let next = session.current().clone();
            debug!("User {user} moves on to {next}");
            (Some(session), Some(next))
        } else {
            debug!("User {user} completed the session");
            (None, None)
        };

        let finished = QuizFinished {
            quiz: current,
            lang,
            answers,
            score,
            next,
            totals,
        };
        Ok((remaining, AdvanceResult::QuizFinished(finished)))
    }

    pub fn answers_for(&self, user: UserId, quiz: &QuizId) -> Result<Option<Vec<u32>>, QuizError> {
        Ok(self.session(user)?.answers_for(quiz).map(<[u32]>::to_vec))
    }
}
